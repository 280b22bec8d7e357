// LLM prompt templates for résumé evaluation and optimization.
// Placeholders: {resume_text}, {jd_text}. Substitution is single-pass.

/// Evaluation prompt. The model answers with one JSON object carrying
/// "JD Match", "MissingKeywords" and "Profile Summary".
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Act like a skilled and very experienced ATS (Applicant Tracking System)
with a deep understanding of the tech field: software engineering, data science, data analysis,
big data engineering, AI product management, cybersecurity and generative AI.
Your task is to evaluate the resume against the given job description.
Assume the job market is very competitive and give the best possible assistance for improving the resume.
Assign the percentage match based on the job description and list the missing keywords with high accuracy.

Resume:
{resume_text}

Job Description:
{jd_text}

Respond with JSON only, in exactly this shape:
{
  "JD Match": "%",
  "MissingKeywords": [],
  "Profile Summary": ""
}"#;

/// Optimization prompt. The model returns only the rewritten résumé text.
pub const OPTIMIZATION_PROMPT_TEMPLATE: &str = r#"You are a professional resume writer and a specialist in ATS optimization.
Revise the resume to achieve maximum ATS compatibility (aiming for close to 100%).

Guidelines:
1. Impact framework with metrics.

Articulate every achievement using this structure:
"Accomplished [X] as measured by [Y] metric or percentage by executing [Z]."

- [X]: What specific result or outcome was achieved? (e.g. improved revenue, increased efficiency, reduced costs)
- [Y]: What metric or percentage quantifies the achievement? (e.g. 20% growth, $100K saved, 50% improvement)
- [Z]: What actions, strategies or initiatives produced the result? (e.g. process overhaul, team collaboration, new technology)

Examples:

- "Accomplished [X] as measured by [Y] metric or percentage by executing [Z]."
  e.g. Increased sales by 15% as measured by revenue growth by implementing a targeted email marketing campaign.

- "Accomplished [X] by [Y]% in [Z] time frame by [action]."
  e.g. Reduced customer churn by 30% in 3 months by revamping the onboarding process.

Job Description:
{jd_text}

Current Resume:
{resume_text}

Return the improved resume text only."#;

pub fn build_evaluation_prompt(resume_text: &str, jd_text: &str) -> String {
    render_template(
        EVALUATION_PROMPT_TEMPLATE,
        &[("{resume_text}", resume_text), ("{jd_text}", jd_text)],
    )
}

pub fn build_optimization_prompt(resume_text: &str, jd_text: &str) -> String {
    render_template(
        OPTIMIZATION_PROMPT_TEMPLATE,
        &[("{resume_text}", resume_text), ("{jd_text}", jd_text)],
    )
}

/// Replaces placeholders left to right. Substituted values are never rescanned,
/// so a résumé that happens to contain `{jd_text}` stays verbatim.
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    loop {
        let next = vars
            .iter()
            .filter_map(|(key, value)| rest.find(key).map(|at| (at, *key, *value)))
            .min_by_key(|(at, _, _)| *at);

        match next {
            Some((at, key, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + key.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}
