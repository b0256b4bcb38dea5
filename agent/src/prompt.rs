use crate::llm::ChatMessage;
use retrieval::Document;

const SYSTEM_PROMPT: &str = "You are a documentation assistant. Use only the provided context to answer. \
If the context is insufficient, say so and suggest what to check next. \
Cite sources by filename in the format (source: file.md). \
Keep the answer concise and structured as: short answer, steps, citations.";

/// Assemble the chat messages for one question: a fixed system prompt plus a
/// user message carrying `[source: name]` context blocks, optional tool
/// output, and the question itself.
pub fn build_prompt(question: &str, retrieved: &[&Document], tool_output: &str) -> Vec<ChatMessage> {
    let context = retrieved
        .iter()
        .map(|doc| format!("[source: {}]\n{}", doc.name, doc.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user = format!(
        "Context:\n{}\n\nTool output (if any):\n{}\n\nQuestion:\n{}\n",
        if context.is_empty() {
            "(no relevant context retrieved)"
        } else {
            context.as_str()
        },
        if tool_output.is_empty() {
            "(none)"
        } else {
            tool_output
        },
        question,
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval::{Corpus, DocInput};

    fn corpus() -> Corpus {
        Corpus::build(vec![DocInput {
            id: "guide.md".into(),
            name: "guide.md".into(),
            text: "  How to log in.  ".into(),
        }])
        .unwrap()
    }

    #[test]
    fn context_blocks_cite_document_names() {
        let corpus = corpus();
        let retrieved: Vec<&Document> = corpus.docs().iter().collect();
        let messages = build_prompt("how do i log in?", &retrieved, "");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("[source: guide.md]\nHow to log in."));
        assert!(messages[1].content.contains("Question:\nhow do i log in?"));
        assert!(messages[1].content.contains("Tool output (if any):\n(none)"));
    }

    #[test]
    fn empty_retrieval_uses_placeholder() {
        let messages = build_prompt("anything", &[], "");
        assert!(messages[1].content.contains("(no relevant context retrieved)"));
    }

    #[test]
    fn tool_output_is_included_when_present() {
        let messages = build_prompt("job script please", &[], "#!/bin/bash");
        assert!(messages[1].content.contains("Tool output (if any):\n#!/bin/bash"));
    }
}
