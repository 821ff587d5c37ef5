//! Prompt text for the LLM-backed collaborators.
//!
//! Each builder returns the `(system, user)` pair sent to the provider. The
//! output contracts stated here are the ones the stages decode.

use super::traits::SummarySlot;

pub const ADMISSIBILITY_SYSTEM: &str =
    "You are a legal safety filter ensuring queries are ethical and appropriate.";

pub fn admissibility(query: &str) -> (String, String) {
    let user = format!(
        r#"You are a legal AI assistant. Decide whether this query is safe to process.

Rules:
- If the query incites violence, promotes crime or encourages self-harm, answer:
  This query involves harm or unethical actions. Please seek professional legal help.
- If the query is a legal question (including questions about crimes and punishments), answer:
  Safe
- If the query is non-legal, vague or lacks legal relevance, answer:
  Not a legal query.
- If the query is about foreign laws, answer:
  Not Applicable in Indian Law.

Query:
"{query}"

Answer with exactly one of the four sentences above and nothing else."#
    );
    (ADMISSIBILITY_SYSTEM.to_string(), user)
}

pub const DOMAIN_SYSTEM: &str = "You are an Indian legal assistant that classifies legal queries.";

pub fn domain(query: &str) -> (String, String) {
    let user = format!(
        r#"Classify the query ONLY under the legal framework of India.

- civil_law: private disputes between individuals or entities; family, property,
  contract, business, labour or consumer matters; remedies are compensation,
  court orders or compliance rather than punishment.
- criminal_law: acts punishable under the Indian Penal Code or other Indian
  criminal laws by imprisonment, fine or state prosecution.
- both: a personal dispute AND an offence punishable under criminal law
  (for example bigamy, domestic violence, fraud in business).
- na: the query concerns an area of law that does not exist in India.

Query:
"{query}"

Analyze legal violations and consequences, not keywords. Answer with exactly
one label: civil_law, criminal_law, both or na."#
    );
    (DOMAIN_SYSTEM.to_string(), user)
}

pub fn generation(query: &str, context: &str, n: usize) -> (String, String) {
    let system = "You are an AI legal assistant for Indian law. Give precise, legally accurate, \
                  well-structured answers based only on the retrieved legal documents. Cite the \
                  statutes, sections and case law you rely on. Keep a neutral, professional tone."
        .to_string();
    let user = format!(
        r#"Retrieved legal documents:
{context}

User query:
{query}

Write {n} distinct, legally accurate answers. Return ONLY a JSON array of {n} objects:
[{{"response_id": "resp_001", "response": "<answer paragraph>", "citations": "<Law Name, Section, Case, Year>"}}]
Number the ids resp_001, resp_002 and so on. No text outside the JSON."#
    );
    (system, user)
}

pub const ANSWER_RELEVANCE_SYSTEM: &str = "A user will give you a response and a question. \
Rate how relevant the response is to the question. Answer with a number between 0.0 and 1.0 \
rounded to two decimal places. 0.0 means completely irrelevant, 1.0 means perfectly relevant.";

pub const CONTEXT_RELEVANCE_SYSTEM: &str = "A user will give you a context and a question. \
Rate how relevant the context is to the question. Answer with a number between 0.0 and 1.0 \
rounded to two decimal places. 0.0 means completely irrelevant, 1.0 means perfectly relevant.";

pub const GROUNDEDNESS_SYSTEM: &str = "A user will give you a response and a context. \
Rate how much the response is supported by the context. Answer with a number between 0.0 and \
1.0 rounded to two decimal places. 0.0 means not at all supported, 1.0 means fully supported.";

pub fn answer_relevance(query: &str, answer: &str) -> (String, String) {
    (
        ANSWER_RELEVANCE_SYSTEM.to_string(),
        format!("Response: {answer} Question: {query}"),
    )
}

pub fn context_relevance(query: &str, context: &str) -> (String, String) {
    (
        CONTEXT_RELEVANCE_SYSTEM.to_string(),
        format!("Context: {context} Question: {query}"),
    )
}

pub fn groundedness(context: &str, answer: &str) -> (String, String) {
    (
        GROUNDEDNESS_SYSTEM.to_string(),
        format!("Context: {context} Response: {answer}"),
    )
}

pub fn summary(
    query: &str,
    first: &SummarySlot,
    second: &SummarySlot,
    context: &str,
) -> (String, String) {
    let system = "You are an AI legal summarizer. Condense legal answers without altering their \
                  legal meaning, keep the essential points and their citations, use the retrieved \
                  context, address the user's query directly and stay neutral."
        .to_string();
    let user = format!(
        r#"User query:
{query}

Retrieved context:
{context}

Legal response 1:
{} (Citation: {})

Legal response 2:
{} (Citation: {})

Return ONLY a JSON object:
{{"query": "<the user query>", "summary": "<summarized legal answer>", "citations": ["<citation>", "..."]}}"#,
        first.text, first.citations, second.text, second.citations
    );
    (system, user)
}

pub fn entities(text: &str) -> (String, String) {
    let system = "You are a named-entity recognizer for privacy protection.".to_string();
    let user = format!(
        r#"List every person name, location, organization, phone number and email address in
the text below, copied exactly as written. Ignore placeholders in square brackets.

Text:
{text}

Return ONLY a JSON array: [{{"text": "<exact span>", "kind": "person|location|organization|phone|email"}}]
Return [] when there are none."#
    );
    (system, user)
}

pub fn detoxify(text: &str) -> (String, String) {
    let system = "You rewrite text to remove toxic, insulting or biased language while keeping \
                  its legal meaning and citations intact."
        .to_string();
    let user = format!("Rewrite the following text. Return only the rewritten text.\n\n{text}");
    (system, user)
}
