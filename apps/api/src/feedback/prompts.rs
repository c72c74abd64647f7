//! Prompt text for résumé feedback.

/// System prompt for feedback generation.
pub const FEEDBACK_SYSTEM: &str = "You are an experienced technical recruiter and career coach. \
    You give specific, actionable advice for aligning a résumé with a job description. \
    Only reference skills and experience that actually appear in the résumé. \
    Do NOT invent experience the candidate does not have.";

/// Builds the user prompt. Inputs are fenced so that text inside them is
/// never read as instructions.
pub fn build_feedback_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        "Compare the résumé below with the job description and write feedback in plain text.\n\
         \n\
         Structure:\n\
         1. Overall fit (2-3 sentences).\n\
         2. Strengths that match the role.\n\
         3. Missing or under-emphasised requirements.\n\
         4. Concrete edits (rephrasings, keywords, quantified results) the candidate should make.\n\
         \n\
         Keep it under 400 words. Do not use markdown tables.\n\
         \n\
         <job_description>\n{job_description}\n</job_description>\n\
         \n\
         <resume>\n{resume_text}\n</resume>"
    )
}
