//! Prompt assembly for note generation and the language-validation pass.

use crate::language::LanguageName;
use crate::subject::SubjectLabel;

fn style_hint(subject: SubjectLabel) -> &'static str {
    match subject {
        SubjectLabel::Mathematics => {
            "State definitions and theorems precisely, keep formulas on their own lines, and add short worked examples."
        }
        SubjectLabel::Physics => {
            "List the governing laws and equations with their units, and explain each symbol."
        }
        SubjectLabel::Chemistry => {
            "Include balanced equations, reaction conditions, and key properties of the substances involved."
        }
        SubjectLabel::Biology => {
            "Organise by structure and function, name processes step by step, and highlight key terminology."
        }
        SubjectLabel::Programming => {
            "Use fenced code blocks for code, explain each snippet, and note common pitfalls."
        }
        SubjectLabel::ComputerScience => {
            "Describe algorithms and data structures with their complexity, using pseudocode where helpful."
        }
        SubjectLabel::History => {
            "Give a chronological timeline with dates, key figures, causes, and consequences."
        }
        SubjectLabel::Geography => {
            "Cover locations, physical features, climate, and human activity, with comparisons where useful."
        }
        SubjectLabel::Literature => {
            "Summarise plot and themes, analyse characters and literary devices, and quote short key lines."
        }
        SubjectLabel::Language => {
            "Explain grammar rules with example sentences, and list vocabulary with meanings."
        }
        SubjectLabel::Art => {
            "Describe techniques, movements, and notable works, with their historical context."
        }
        SubjectLabel::Music => {
            "Explain musical concepts, notation, and structure, with examples of pieces or composers."
        }
        SubjectLabel::Sports => {
            "Summarise rules, techniques, tactics, and notable events or records."
        }
        SubjectLabel::Entertainment => {
            "Summarise the works, people, and events discussed, with key facts and takeaways."
        }
        SubjectLabel::General => {
            "Organise the material into clear sections with key points and a short summary."
        }
    }
}

/// Instruction for the primary generation call. `target` is the language the
/// whole output must be written in; `unknown` defers to the source's language.
pub fn generation_prompt(target: &LanguageName, subject: SubjectLabel, audio: bool) -> String {
    let source = if audio {
        "the attached audio recording"
    } else {
        "the text below"
    };
    let target = if target.is_unknown() {
        format!("the same language as {source}")
    } else {
        target.as_str().to_string()
    };
    format!(
        "You are an expert {subject} tutor. Create well-structured study notes from {source}.\n\
         \n\
         Requirements:\n\
         - Write the ENTIRE output in {target}. Do not switch languages, and do not translate technical terms that are normally kept as-is.\n\
         - Use markdown: a title, section headings, bullet points, and bold key terms.\n\
         - {hint}\n\
         - Finish with a short summary and 3-5 review questions.\n\
         - Only use information present in the source; do not invent facts.",
        subject = subject.as_str(),
        source = source,
        target = target,
        hint = style_hint(subject),
    )
}

/// Instruction for the language-validation pass; the notes follow as a
/// separate part.
pub fn validation_prompt(target: &LanguageName) -> String {
    format!(
        "Rewrite the study notes below so that they are written strictly and entirely in {target}. \
         Keep the structure, markdown formatting, and all content unchanged apart from the language. \
         If the notes are already fully in {target}, return them unchanged. \
         Return only the notes.",
        target = target.as_str()
    )
}
