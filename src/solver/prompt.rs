use std::path::Path;

use tracing::{info, warn};

const FALLBACK_SYSTEM_PROMPT: &str = "You are a patient mathematics teacher. \
Read the exercise, restate what is asked, then solve it step by step, \
justifying every step and ending with a clearly marked final answer.";

/// Reads the system prompt from `path`, falling back to a built-in prompt
/// when the file is missing or empty.
pub async fn load_system_prompt(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(text) if !text.trim().is_empty() => {
            info!(path = %path.display(), "system prompt loaded");
            text
        }
        Ok(_) => {
            warn!(path = %path.display(), "system prompt file is empty; using built-in prompt");
            FALLBACK_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "system prompt unreadable; using built-in prompt");
            FALLBACK_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Tailors the system prompt to the student's school grade.
pub fn build_prompt(system_prompt: &str, school_grade: Option<&str>) -> String {
    let grade = school_grade
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or("unspecified level");
    format!(
        "{}\nThe student's level is: {grade}. The detailed solution must fit this \
         level exactly and use only the methods taught at it.",
        system_prompt.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_mentions_grade() {
        let p = build_prompt("Solve it.\n\n", Some("Second year baccalaureate"));
        assert!(p.starts_with("Solve it.\nThe student's level is: Second year baccalaureate."));
    }

    #[test]
    fn blank_grade_is_unspecified() {
        let p = build_prompt("Solve it.", Some("   "));
        assert!(p.contains("unspecified level"));
        assert_eq!(p, build_prompt("Solve it.", None));
    }

    #[tokio::test]
    async fn missing_file_uses_fallback() {
        let p = load_system_prompt("/definitely/not/here/system_prompt.txt").await;
        assert_eq!(p, FALLBACK_SYSTEM_PROMPT);
    }
}
