//! 数词提取 - 纯函数层
//!
//! 不做任何 I/O：
//! - `split_sentences` 按句末标点分句
//! - `extract` 找出句子中所有连续的中文数词及其字符位置
//! - `ordinal_marker_stats` 统计"第 + 数词"的出现情况

use regex::Regex;

use crate::models::NumeralSpan;

/// 中文数字字符集
pub const NUMERAL_GLYPHS: &str = "零一二三四五六七八九十百千万亿";

/// 含"第"序数词的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrdinalMarkerStats {
    /// 含"第 + 数词"的句子数
    pub sentence_count: usize,
    /// "第 + 数词"总出现次数
    pub match_count: usize,
}

/// 数词提取器
///
/// 正则只在构造时编译一次，之后的所有方法都不会失败。
#[derive(Debug, Clone)]
pub struct NumeralExtractor {
    numeral_run: Regex,
    sentence_break: Regex,
    ordinal_marker: Regex,
}

impl NumeralExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            numeral_run: Regex::new(&format!("[{}]+", NUMERAL_GLYPHS))?,
            sentence_break: Regex::new(r"[。！？\n]+")?,
            ordinal_marker: Regex::new(&format!("第[{}]+", NUMERAL_GLYPHS))?,
        })
    }

    /// 提取句子中所有的中文数词及其位置
    ///
    /// 从左到右扫描，每个位置取最长的连续数字字符，匹配之间不重叠。
    /// 返回的偏移为字符偏移而非字节偏移。
    pub fn extract(&self, text: &str) -> Vec<NumeralSpan> {
        let mut spans = Vec::new();
        let mut byte_cursor = 0;
        let mut char_cursor = 0;

        for m in self.numeral_run.find_iter(text) {
            let start = char_cursor + text[byte_cursor..m.start()].chars().count();
            let end = start + m.as_str().chars().count();
            spans.push(NumeralSpan {
                text: m.as_str().to_string(),
                start,
                end,
            });
            byte_cursor = m.end();
            char_cursor = end;
        }

        spans
    }

    /// 句子中是否含有任一中文数字字符
    pub fn contains_numeral(&self, text: &str) -> bool {
        self.numeral_run.is_match(text)
    }

    /// 按 `。！？` 和换行分句，标点归入前一句
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut last = 0;

        for m in self.sentence_break.find_iter(text) {
            push_trimmed(&mut sentences, &text[last..m.end()]);
            last = m.end();
        }
        push_trimmed(&mut sentences, &text[last..]);

        sentences
    }

    /// 统计"第 + 数词"形式的序数词
    pub fn ordinal_marker_stats<'a, I>(&self, sentences: I) -> OrdinalMarkerStats
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut stats = OrdinalMarkerStats::default();
        for sentence in sentences {
            let matches = self.ordinal_marker.find_iter(sentence).count();
            if matches > 0 {
                stats.sentence_count += 1;
                stats.match_count += matches;
            }
        }
        stats
    }
}

fn push_trimmed(sentences: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        sentences.push(piece.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> NumeralExtractor {
        NumeralExtractor::new().unwrap()
    }

    fn span(text: &str, start: usize, end: usize) -> NumeralSpan {
        NumeralSpan {
            text: text.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_extract_uses_char_offsets() {
        let spans = extractor().extract("三楼住着一百人");
        assert_eq!(spans, vec![span("三", 0, 1), span("一百", 4, 6)]);
    }

    #[test]
    fn test_extract_takes_longest_run() {
        let spans = extractor().extract("共三千五百零二人，分成十组");
        assert_eq!(spans, vec![span("三千五百零二", 1, 7), span("十", 11, 12)]);
    }

    #[test]
    fn test_extract_without_numerals_is_empty() {
        assert!(extractor().extract("").is_empty());
        assert!(extractor().extract("abc 123 你好").is_empty());
    }

    #[test]
    fn test_extract_mixed_width_text() {
        // 前面的 ASCII 与多字节字符都按一个字符计算
        let spans = extractor().extract("a😀b七");
        assert_eq!(spans, vec![span("七", 3, 4)]);
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let sentences = extractor().split_sentences("第一句。第二句！！\n  第三句？尾巴");
        assert_eq!(sentences, vec!["第一句。", "第二句！！", "第三句？", "尾巴"]);
    }

    #[test]
    fn test_split_sentences_drops_blank_pieces() {
        assert!(extractor().split_sentences("").is_empty());
        assert!(extractor().split_sentences("  \n\n ").is_empty());
        // 只有标点的片段仍然保留
        assert_eq!(extractor().split_sentences("。。\n\n"), vec!["。。"]);
    }

    #[test]
    fn test_ordinal_marker_stats() {
        let stats = extractor().ordinal_marker_stats([
            "第一名和第二名",
            "三楼住着一百人",
            "第几名",
            "第十二章",
        ]);
        assert_eq!(
            stats,
            OrdinalMarkerStats {
                sentence_count: 2,
                match_count: 3,
            }
        );
    }
}
