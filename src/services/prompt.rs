//! 批量标注提示词

use serde::Serialize;

use crate::models::NumeralOccurrence;

/// 提示词中每条记录的形式
#[derive(Debug, Serialize)]
struct PromptItem<'a> {
    id: i64,
    sentence: &'a str,
    number: &'a str,
    position: usize,
}

/// 构造批量判断 prompt
///
/// 一个批次只发一次请求，每条记录带上 id、句子、数词和起始位置。
pub fn build_batch_prompt(batch: &[NumeralOccurrence]) -> Result<String, serde_json::Error> {
    let items: Vec<PromptItem<'_>> = batch
        .iter()
        .map(|r| PromptItem {
            id: r.id,
            sentence: &r.sentence,
            number: &r.number_text,
            position: r.start,
        })
        .collect();
    let items_json = serde_json::to_string_pretty(&items)?;

    Ok(format!(
        r#"你是一个中文数词语义分析专家。我会给你一个JSON数组，每个元素包含：
- id: 记录ID
- sentence: 完整的中文句子
- number: 句子中提取的数词文本
- position: 数词在句子中的起始位置（按字符计）

请判断每个数词在其句子中的语义类型，返回整数：
- 0: 基数含义（表示数量，如"一百人"的"一百"）
- 1: 序数含义（表示顺序，如"三楼"的"三"、"二月"的"二"）
- 2: 无数字含义（如"一向"的"一"、"万一"的"万"。这一类多为固定短语，但并非所有短语中的数词都没有数字含义，比如"同一"的"一"是"一个"的意思）

重要提示：
1. 即使数词看起来是基数词形式，也可能表达序数含义
2. 注意区分"三个苹果"（基数）和"三楼"（序数）
3. 每个数词独立判断，同一句子中不同数词可能有不同含义
4. 每条记录都必须返回，id 与输入保持一致

请返回JSON格式：{{"results": [{{"id": 1, "type": 0}}, {{"id": 2, "type": 1}}, ...]}}

输入数据：
{}
"#,
        items_json
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabelType;
    use chrono::Utc;

    #[test]
    fn test_prompt_embeds_every_record() {
        let batch = vec![
            NumeralOccurrence {
                id: 7,
                source_id: 1,
                sentence: "三楼住着一百人".to_string(),
                number_text: "一百".to_string(),
                start: 4,
                end: 6,
                label: LabelType::Unlabeled,
                created_at: Utc::now(),
            },
            NumeralOccurrence {
                id: 8,
                source_id: 2,
                sentence: "万一下雨".to_string(),
                number_text: "万一".to_string(),
                start: 0,
                end: 2,
                label: LabelType::Unlabeled,
                created_at: Utc::now(),
            },
        ];

        let prompt = build_batch_prompt(&batch).unwrap();
        assert!(prompt.contains(r#""id": 7"#));
        assert!(prompt.contains(r#""number": "一百""#));
        assert!(prompt.contains(r#""position": 4"#));
        assert!(prompt.contains(r#""sentence": "万一下雨""#));
        assert!(prompt.contains(r#"{"results": [{"id": 1, "type": 0}"#));
    }
}
