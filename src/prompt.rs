//! Prompt augmentation
//!
//! Folds retrieved context and the user's question into the single message
//! sent to the agent.

/// Build the augmented message for `question` grounded in `context`
pub fn augment(question: &str, context: &str) -> String {
    format!(
        "Answer the question using the context below. \
         If the context does not contain enough information to answer, \
         say so explicitly instead of guessing.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}"
    )
}
