//! 文本分块器
//!
//! 将长文本按句子边界切分为有上限的分块，供 map-reduce 摘要器使用。
//! 切分保证不破坏句子：单个超长句子整句保留在自己的分块中。

/// 默认分块字符数上限（按生成服务的上下文预算调整）
pub const DEFAULT_MAX_CHARS: usize = 4000;

/// 检查是否为句末标点
#[inline]
fn is_sentence_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// 按句末标点 + 空白切分出句子序列
///
/// 句末标点（`.` `!` `?`）后紧跟空白字符时闭合当前句子。
/// 每个句子两端去除空白；不产生空句子。
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_terminal = false;

    for ch in text.chars() {
        if prev_terminal && ch.is_whitespace() {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
            prev_terminal = false;
            continue;
        }

        // 跳过句首空白
        if current.is_empty() && ch.is_whitespace() {
            continue;
        }

        current.push(ch);
        prev_terminal = is_sentence_terminal(ch);
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// 将文本切分为有序分块
///
/// 策略：
/// 1. 按句子边界切分（`.` `!` `?` 后跟空白）
/// 2. 贪心累积句子；若追加下一句会超过 `max_chars` 且缓冲区非空，
///    则闭合当前分块并以该句开启新分块
/// 3. 单句超过 `max_chars` 时整句独占一个分块（接受超限，不拆句）
///
/// 空输入返回空序列；无句末标点的输入恰好返回一个分块。
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for sentence in sentences {
        let sentence_chars = sentence.chars().count();

        // 追加会超限且缓冲区非空时闭合当前分块
        if !buffer.is_empty() && buffer_chars + 1 + sentence_chars > max_chars {
            chunks.push(std::mem::take(&mut buffer));
            buffer_chars = 0;
        }

        if buffer.is_empty() {
            buffer.push_str(&sentence);
            buffer_chars = sentence_chars;
        } else {
            buffer.push(' ');
            buffer.push_str(&sentence);
            buffer_chars += 1 + sentence_chars;
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("   \n\t ", 100).is_empty());
    }

    #[test]
    fn test_no_terminal_punctuation_yields_one_chunk() {
        let chunks = chunk_text("no punctuation at all here", 5);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "no punctuation at all here");
    }

    #[test]
    fn test_sentences_packed_under_limit() {
        let text = "One two. Three four. Five six.";
        let chunks = chunk_text(text, 20);

        assert_eq!(
            chunks,
            vec!["One two. Three four.".to_string(), "Five six.".to_string()]
        );
    }

    #[test]
    fn test_oversized_sentence_kept_whole() {
        let text = "Short. This single sentence is much longer than the limit. End.";
        let chunks = chunk_text(text, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Short.");
        assert_eq!(chunks[1], "This single sentence is much longer than the limit.");
        assert_eq!(chunks[2], "End.");
    }

    #[test]
    fn test_chunk_length_bounded() {
        let text = "Aaa bbb ccc. Ddd eee fff. Ggg hhh iii. Jjj kkk lll.";
        let max = 30;
        for chunk in chunk_text(text, max) {
            assert!(chunk.chars().count() <= max, "chunk too long: {}", chunk);
        }
    }

    #[test]
    fn test_reconstruction_preserves_sentence_content() {
        let text = "First sentence. Second one!  Third?\nFourth line here.";
        let chunks = chunk_text(text, 25);
        let rejoined = chunks.join(" ");

        for sentence in ["First sentence.", "Second one!", "Third?", "Fourth line here."] {
            assert!(rejoined.contains(sentence), "missing: {}", sentence);
        }
        // 无重复：单空格连接后与规范化原文等长
        assert_eq!(
            rejoined.len(),
            "First sentence. Second one! Third? Fourth line here.".len()
        );
    }

    #[test]
    fn test_terminal_without_whitespace_does_not_split() {
        // 小数点后无空白，不视为句子边界
        let chunks = chunk_text("Pi is 3.14 roughly. Next sentence.", 20);
        assert_eq!(chunks[0], "Pi is 3.14 roughly.");
    }

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("Hello there. How are you? Fine!");
        assert_eq!(sentences, vec!["Hello there.", "How are you?", "Fine!"]);
    }
}
