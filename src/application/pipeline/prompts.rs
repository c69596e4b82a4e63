//! 生成服务提示词模板
//!
//! 所有提示词集中在此，便于整体调整语气与约束。

/// map 阶段：单个分块的摘要
pub fn chunk_summary(chunk: &str, language: &str) -> String {
    format!(
        "Summarize the following transcript section into concise bullet points \
         that capture every key fact and decision. Write the summary in {language}.\n\n\
         Section:\n{chunk}"
    )
}

/// reduce 阶段：把全部分块摘要合成为层级式总摘要
pub fn synthesis(partials: &[String], language: &str) -> String {
    let sections = partials.join("\n\n");
    format!(
        "Combine the following section summaries into one coherent hierarchical \
         summary: a short overview paragraph followed by detailed points. \
         Write it in {language}. Do not add information that is not present in \
         the sections.\n\nSection summaries:\n{sections}"
    )
}

/// 排版阶段：结构化编辑，不得增删语义内容
pub fn format_transcript(text: &str, language: &str) -> String {
    format!(
        "Reformat the following raw transcript: add paragraph breaks, normalize \
         casing and punctuation, and apply light markup where helpful. Preserve \
         all original content; do not summarize, translate, or editorialize. \
         The text is in {language}.\n\nTranscript:\n{text}"
    )
}

/// 翻译阶段：直译，不加评注
pub fn translate(text: &str, source: &str, target: &str) -> String {
    format!(
        "Translate the following text from {source} to {target}. Output only the \
         direct translation with no added commentary.\n\nText:\n{text}"
    )
}
