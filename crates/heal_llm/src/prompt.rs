//! Prompt construction.

use heal_runner::{Language, LanguageProfile};

/// Requirements appended to every request for a language.
fn requirements(language: Language) -> &'static [&'static str] {
    match language {
        Language::Rust => &[
            "Declare any crate dependencies as comment lines at the top, e.g. `// rand = \"0.8\"`",
            "Include tests using #[cfg(test)]",
            "Make sure the code compiles and all tests pass",
            "Use proper error handling",
        ],
        Language::Python => &[
            "Include all necessary imports",
            "Include unittest or pytest tests for the main functionality",
            "Make sure the code runs without errors",
            "Use proper error handling",
        ],
        _ => &[
            "Include everything needed to build and run as a single file",
            "Exit with a non-zero status if any check fails",
            "Make sure the code runs without errors",
        ],
    }
}

/// Build the user prompt for one generation.
pub fn build_prompt(request: &str, profile: &LanguageProfile, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a complete {} program for: {}\n\nRequirements:\n",
        profile.display_name, request
    );
    for requirement in requirements(profile.language) {
        prompt.push_str("- ");
        prompt.push_str(requirement);
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "- Reply with the program in a single ```{} code block\n",
        profile.language
    ));

    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        prompt.push_str(&format!(
            "\nIMPORTANT: The previous attempt failed with this error:\n{}\n\nPlease fix this error in your new implementation.\n",
            feedback.trim_end()
        ));
    }

    prompt
}
