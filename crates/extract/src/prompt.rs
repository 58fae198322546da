use rand::Rng;

use crate::error::{NerError, NerResult};
use crate::llm::ChatMessage;
use crate::schema::{EntityTypeMap, LabeledSentence};

pub const TABLE_HEADER: &str = "|实体类别|实体名称|实体起始位置|实体结束位置|";
pub const TABLE_SEPARATOR: &str = "|-----|-----|-----|-----|";

/// Instruction naming the task, the reply table shape and the closed type set.
pub fn build_system_instruction(types: &EntityTypeMap) -> String {
    let labels = types
        .labels()
        .iter()
        .map(|l| format!("'{}'", l))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "你是一个中文医疗信息处理的助手，你要完成命名实体识别的任务，根据给定的句子，识别出其中的实体，如果不存在则回答：无\n\
         按照表格形式回复，表格有四列且表头为（实体类型，实体名称，实体起始位置，实体结束位置）（注：位置从零开始计数）。给定实体类型列表：[{}]。",
        labels
    )
}

/// Render one labeled sentence as a few-shot block: the sentence, then its
/// gold entities as table rows in annotation order. A sentence without gold
/// entities renders no table.
pub fn render_example(example: &LabeledSentence) -> String {
    let mut rendered = format!("文本：\n {} \n", example.text);
    if example.entities.is_empty() {
        return rendered;
    }

    rendered.push_str(TABLE_HEADER);
    rendered.push('\n');
    rendered.push_str(TABLE_SEPARATOR);
    rendered.push('\n');

    for entity in &example.entities {
        rendered.push_str(&format!(
            "|{}|{}|{}|{}|\n",
            entity.entity_type.label(),
            entity.entity,
            entity.start_idx,
            entity.end_idx
        ));
    }

    rendered
}

/// The three-part conversation sent for one run.
pub fn build_messages(
    system_instruction: &str,
    examples: &[String],
    sentence: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_instruction),
        ChatMessage::assistant(examples.join("\n")),
        ChatMessage::user(sentence),
    ]
}

/// Draws few-shot examples uniformly, with replacement, from a training split.
pub struct ExampleSampler {
    source: Vec<LabeledSentence>,
}

impl ExampleSampler {
    pub fn new(source: Vec<LabeledSentence>) -> Self {
        Self { source }
    }

    pub fn sample<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> NerResult<Vec<String>> {
        if self.source.is_empty() {
            return Err(NerError::EmptyExampleSource);
        }

        Ok((0..k)
            .map(|_| {
                let idx = rng.gen_range(0..self.source.len());
                render_example(&self.source[idx])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityRecord, EntityType};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sentence(text: &str, entities: Vec<EntityRecord>) -> LabeledSentence {
        LabeledSentence {
            text: text.to_string(),
            entities,
        }
    }

    #[test]
    fn test_render_example() {
        let example = sentence(
            "患儿发热三天",
            vec![EntityRecord {
                entity: "发热".to_string(),
                entity_type: EntityType::Symptom,
                start_idx: 2,
                end_idx: 3,
            }],
        );

        assert_eq!(
            render_example(&example),
            "文本：\n 患儿发热三天 \n\
             |实体类别|实体名称|实体起始位置|实体结束位置|\n\
             |-----|-----|-----|-----|\n\
             |临床表现|发热|2|3|\n"
        );
    }

    #[test]
    fn test_render_example_without_entities() {
        let example = sentence("患者一般情况可", Vec::new());
        assert_eq!(render_example(&example), "文本：\n 患者一般情况可 \n");
    }

    #[test]
    fn test_sample_empty_source() {
        let sampler = ExampleSampler::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(7);

        assert!(matches!(
            sampler.sample(3, &mut rng),
            Err(NerError::EmptyExampleSource)
        ));
    }

    #[test]
    fn test_sample_with_replacement() {
        let sampler = ExampleSampler::new(vec![sentence("唯一的句子", Vec::new())]);
        let mut rng = StdRng::seed_from_u64(7);

        let examples = sampler.sample(4, &mut rng).unwrap();
        assert_eq!(examples.len(), 4);
        assert!(examples.iter().all(|e| e.contains("唯一的句子")));
    }

    #[test]
    fn test_system_instruction_lists_all_labels() {
        let instruction = build_system_instruction(&EntityTypeMap::new());
        for t in EntityType::ALL {
            assert!(instruction.contains(t.label()));
        }
    }

    #[test]
    fn test_messages_roles() {
        let messages = build_messages("sys", &["a".to_string(), "b".to_string()], "句子");
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "assistant", "user"]);
        assert_eq!(messages[1].content, "a\nb");
    }
}
