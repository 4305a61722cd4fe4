//! Prompt text for every model call the pipelines make.
//!
//! Kept in one place so wording changes never touch control flow.

use crate::plan::Plan;
use crate::request::Mode;

/// Schema example embedded in every structured-plan prompt.
const PLAN_SCHEMA_EXAMPLE: &str =
    r#"{"plan": {"title": "...", "tasks": [{"description": "...", "subtasks": ["...", "..."]}]}}"#;

/// Characters of an imported document sent for topic extraction.
pub const DOCUMENT_EXCERPT_CHARS: usize = 4000;

pub fn structured_plan(topic: &str, mode: Mode) -> String {
    let depth = match mode {
        Mode::Deep => "详细",
        Mode::Quick => "简明",
    };
    format!(
        "请生成一个关于\"{topic}\"的{depth}学习计划。\
         只返回一个完整的 JSON 对象，不要添加任何解释，结构如下：\n{PLAN_SCHEMA_EXAMPLE}"
    )
}

pub fn step_list(topic: &str) -> String {
    format!(
        "请列出学习\"{topic}\"的核心步骤，\
         只返回一个字符串列表，例如：[\"步骤1\", \"步骤2\", \"步骤3\"]，不要添加任何说明。"
    )
}

pub fn step_prose(topic: &str) -> String {
    format!("请详细描述学习\"{topic}\"需要经历的关键步骤。")
}

pub fn steps_from_prose(topic: &str, prose: &str) -> String {
    format!(
        "请从下面的文本中提取学习\"{topic}\"的重要步骤，\
         只返回一个字符串列表，例如：[\"步骤1\", \"步骤2\"]，不要添加解释。\n\
         文本内容:\n---\n{prose}\n---"
    )
}

/// Base refinement prompt; the attempt counter is appended per call.
pub fn refinement(current: &Plan, insights: &[String]) -> String {
    let plan_json = serde_json::to_string_pretty(&current.clone().into_envelope())
        .unwrap_or_else(|_| String::from("{}"));
    let insight_lines = insights
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "你是一位学习规划专家。请根据用户当前的学习计划和学习体会，调整并优化这份计划。\n\n\
         当前计划(JSON):\n{plan_json}\n\n\
         用户体会:\n{insight_lines}\n\n\
         只返回调整后的学习计划 JSON，不要添加任何解释，格式保持为\n{PLAN_SCHEMA_EXAMPLE}\n\
         每个任务至少包含一个子任务。"
    )
}

pub fn refinement_attempt(base: &str, attempt: usize) -> String {
    format!("{base}\n请返回调整后的学习计划。尝试次数: {attempt}。")
}

pub fn remedial(topic: &str, struggle_point: &str) -> String {
    format!(
        "你是一位严谨高效的学习导师。学生在学习\"{topic}\"时，在\"{struggle_point}\"上遇到了困难。\
         请生成一个简短（1-2 个任务）、聚焦、具体的强化练习计划，只返回如下结构的 JSON：\n\
         {{\"plan\": {{\"title\": \"强化练习: {struggle_point}\", \"tasks\": [{{\"description\": \"...\", \"subtasks\": [\"...\", \"...\"]}}]}}}}\n\
         任务描述和子任务都必须围绕这个困难点。"
    )
}

pub fn elaboration(topic: &str, task_description: &str) -> String {
    format!(
        "作为学习导师，请针对学习主题\"{topic}\"中的任务\"{task_description}\"，\
         提供更详细的解释、背景知识或具体执行步骤。直接返回清晰、可执行的说明文本。"
    )
}

pub fn coach_answer(topic: &str, question: &str, subtasks: &[String]) -> String {
    let subtasks_json = serde_json::to_string(subtasks).unwrap_or_else(|_| String::from("[]"));
    format!(
        "你是一名耐心专业的学习辅导员。用户正在学习主题\"{topic}\"，现在针对问题\"{question}\"寻求帮助。\n\
         当前的学习子任务：{subtasks_json}\n\n\
         请简明扼要地回答；如果问题超出主题范围，请礼貌地引导用户回到主题。"
    )
}

pub fn document_topic(content: &str) -> String {
    let excerpt: String = content.chars().take(DOCUMENT_EXCERPT_CHARS).collect();
    format!(
        "请阅读以下文档，提炼出它的主要学习主题。只返回一个简洁准确的主题名称，不要包含任何解释。\n\
         文档内容:\n---\n{excerpt}\n---"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_changes_only_wording() {
        let quick = structured_plan("递归", Mode::Quick);
        let deep = structured_plan("递归", Mode::Deep);
        assert!(quick.contains("简明"));
        assert!(deep.contains("详细"));
        assert!(quick.contains(PLAN_SCHEMA_EXAMPLE));
        assert!(deep.contains(PLAN_SCHEMA_EXAMPLE));
    }

    #[test]
    fn refinement_embeds_plan_and_insights() {
        let plan = Plan::single_task("递归", "d", vec!["s1".into()]);
        let prompt = refinement(&plan, &["太难了".into(), "需要例子".into()]);
        assert!(prompt.contains("\"title\": \"递归\""));
        assert!(prompt.contains("- 太难了\n- 需要例子"));
        assert!(refinement_attempt(&prompt, 2).ends_with("尝试次数: 2。"));
    }

    #[test]
    fn remedial_prompt_has_literal_braces() {
        let prompt = remedial("递归", "基线条件判断");
        assert!(prompt.contains("{\"plan\": {\"title\": \"强化练习: 基线条件判断\""));
    }

    #[test]
    fn document_excerpt_is_bounded() {
        let content = "字".repeat(DOCUMENT_EXCERPT_CHARS + 500);
        let prompt = document_topic(&content);
        assert_eq!(
            prompt.chars().filter(|c| *c == '字').count(),
            DOCUMENT_EXCERPT_CHARS
        );
    }
}
