//! Prompt assembly: base system prompt plus retrieval context and weakness
//! reminders. Deterministic string concatenation, nothing else.

use tracing::debug;

use crate::weakness::WeaknessMatch;

/// Base system prompt used when the caller supplies none.
pub const DEFAULT_BASE_PROMPT: &str = "你是一位专业、耐心、友善的医疗健康助手。你的任务是回答患者关于常见疾病、检查、手术和疫苗的一般性医疗健康问题。

## 核心原则

1. **准确性第一**: 提供准确、基于证据的医疗信息
2. **通俗易懂**: 使用患者能理解的简单中文，避免过多专业术语
3. **完整但简洁**: 回答要全面但不冗长，突出重点
4. **安全边界**: 明确告知\"建议咨询医生\"的情况

## 禁止行为

- ❌ 给出明确诊断（例如：\"你肯定是...\"）
- ❌ 推荐具体药物剂量
- ❌ 替代专业医疗建议
- ❌ 对症状做出保证性判断

## 回答结构

1. 直接回答核心问题
2. 提供相关背景信息（如适用）
3. 给出实用建议
4. 说明何时需要就医";

const REFERENCE_SECTION_HEADER: &str = "## 权威医学参考资料";
const WEAKNESS_SECTION_HEADER: &str = "## ⚠️ 针对该问题类型的特别提醒";

/// Assembles enhanced prompts from routing outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Builds the final prompt: base text, optional reference material,
    /// then one reminder per matched weakness, in the order given.
    pub fn build_prompt(
        &self,
        base_prompt: Option<&str>,
        weaknesses: &[WeaknessMatch],
        rag_context: Option<&str>,
    ) -> String {
        let mut prompt = base_prompt.unwrap_or(DEFAULT_BASE_PROMPT).to_string();

        if let Some(context) = rag_context {
            if !context.is_empty() {
                prompt.push_str("\n\n");
                prompt.push_str(REFERENCE_SECTION_HEADER);
                prompt.push_str("\n\n");
                prompt.push_str(context);
            }
        }

        if !weaknesses.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.format_weakness_section(weaknesses));
            debug!(reminders = weaknesses.len(), "added weakness reminders to prompt");
        }

        prompt
    }

    /// Formats the weakness reminders as a standalone section, for callers
    /// injecting into an existing prompt.
    pub fn format_weakness_section(&self, weaknesses: &[WeaknessMatch]) -> String {
        if weaknesses.is_empty() {
            return String::new();
        }

        let mut section = format!("{WEAKNESS_SECTION_HEADER}\n");
        for matched in weaknesses {
            if !matched.weakness.prompt_addition.is_empty() {
                section.push('\n');
                section.push_str(&matched.weakness.prompt_addition);
                section.push('\n');
            }
        }
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::Severity;
    use crate::weakness::{WeaknessPattern, WeaknessTriggers};

    fn matched(id: &str, addition: &str) -> WeaknessMatch {
        WeaknessMatch {
            weakness: WeaknessPattern {
                weakness_id: id.to_string(),
                category: "diseases".to_string(),
                subcategory: String::new(),
                description: String::new(),
                severity: Severity::Major,
                frequency: 0.5,
                triggers: WeaknessTriggers::default(),
                prompt_addition: addition.to_string(),
            },
            match_score: 0.4,
        }
    }

    #[test]
    fn test_default_base_without_signals() {
        let prompt = PromptBuilder.build_prompt(None, &[], None);
        assert_eq!(prompt, DEFAULT_BASE_PROMPT);
    }

    #[test]
    fn test_custom_base_is_used_verbatim() {
        let prompt = PromptBuilder.build_prompt(Some("自定义提示"), &[], None);
        assert_eq!(prompt, "自定义提示");
    }

    #[test]
    fn test_rag_context_section() {
        let prompt = PromptBuilder.build_prompt(Some("base"), &[], Some("参考资料正文"));
        assert_eq!(prompt, "base\n\n## 权威医学参考资料\n\n参考资料正文");
    }

    #[test]
    fn test_empty_rag_context_adds_nothing() {
        let prompt = PromptBuilder.build_prompt(Some("base"), &[], Some(""));
        assert_eq!(prompt, "base");
    }

    #[test]
    fn test_weakness_reminders_in_given_order() {
        let weaknesses = vec![matched("w1", "提醒一"), matched("w2", "提醒二")];
        let prompt = PromptBuilder.build_prompt(Some("base"), &weaknesses, None);

        assert_eq!(
            prompt,
            "base\n\n## ⚠️ 针对该问题类型的特别提醒\n\n提醒一\n\n提醒二\n"
        );
    }

    #[test]
    fn test_sections_ordered_context_before_reminders() {
        let weaknesses = vec![matched("w1", "提醒")];
        let prompt = PromptBuilder.build_prompt(Some("base"), &weaknesses, Some("资料"));

        let context_at = prompt.find("权威医学参考资料").unwrap();
        let reminder_at = prompt.find("特别提醒").unwrap();
        assert!(context_at < reminder_at);
    }

    #[test]
    fn test_format_weakness_section_standalone() {
        assert_eq!(PromptBuilder.format_weakness_section(&[]), "");

        let section = PromptBuilder.format_weakness_section(&[matched("w1", "提醒")]);
        assert_eq!(section, "## ⚠️ 针对该问题类型的特别提醒\n\n提醒\n");
    }
}
