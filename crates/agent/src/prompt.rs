//! Prompts for the deciding and answering steps.

/// System prompt for the deciding step.
pub const DECISION_SYSTEM: &str = "You are a research agent answering a question from documents. \
You are shown the observations gathered so far by tools bound to those documents. \
Decide whether they are enough to answer the question. \
Respond with valid JSON only, no markdown and no extra text.";

/// System prompt for answering.
pub const ANSWER_SYSTEM: &str = "You are a helpful assistant that answers questions accurately \
and says plainly when information is missing.";

/// Ask whether the gathered observations answer the query.
pub fn decision_prompt(query: &str, observations: &str, iteration: u32, max_iterations: u32) -> String {
    format!(
        "USER QUESTION: {query}\n\n\
         OBSERVATIONS SO FAR (step {iteration} of at most {max_iterations}):\n{observations}\n\n\
         If the observations are enough to answer the question, respond with:\n\
         {{\"action\": \"final_answer\", \"answer\": \"<your comprehensive answer>\", \"reasoning\": \"<how you derived it>\"}}\n\n\
         If more information is needed, respond with:\n\
         {{\"action\": \"continue\", \"next_sub_question\": \"<a focused question for the next tool>\", \"reasoning\": \"<what is missing>\"}}\n\n\
         Ask for a sub-question only when the next step needs something narrower than the original question."
    )
}

/// Synthesize an answer from everything gathered.
pub fn synthesis_prompt(query: &str, observations: &str) -> String {
    format!(
        "Based on the following retrieved information, provide a comprehensive answer to the question.\n\n\
         QUESTION: {query}\n\n\
         RETRIEVED INFORMATION:\n{observations}\n\n\
         ANSWER:"
    )
}

/// Answer without any document context.
pub fn direct_prompt(query: &str) -> String {
    format!(
        "No document in the current selection is relevant to this question. \
         Answer it from general knowledge, and say so if it depends on documents you have not seen.\n\n\
         QUESTION: {query}\n\n\
         ANSWER:"
    )
}
