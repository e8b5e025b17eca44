use crate::error::IngestError;
use regex::Regex;

pub const OCR_TYPOS: [(&str, &str); 12] = [
    ("ôe", "se"),
    ("arto", "arte"),
    ("homom", "homem"),
    ("arfo", "arco"),
    ("prosonça", "presença"),
    ("matoriais", "materiais"),
    ("ciêm", "ciem"),
    ("educandário", "escola"),
    ("prôf", "prof"),
    ("aôr", "amor"),
    ("dô", "do"),
    ("qne", "que"),
];

const NOISE_PATTERN: &str = r#"[^A-Za-zÀ-ÿ0-9\s,.;:!?'"()\-–—]{3,}"#;
const HYPHEN_BREAK_PATTERN: &str = r"(\w+)-\s*\n\s*(\w+)";
const WHITESPACE_PATTERN: &str = r"\s+";

pub struct TextCleaner {
    min_line_chars: usize,
    noise: Regex,
    hyphen_break: Regex,
    whitespace: Regex,
    typos: Vec<(Regex, &'static str)>,
}

impl TextCleaner {
    pub fn new(min_line_chars: usize) -> Result<Self, IngestError> {
        let typos = OCR_TYPOS
            .iter()
            .map(|(wrong, right)| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(wrong)))
                    .map(|pattern| (pattern, *right))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            min_line_chars,
            noise: Regex::new(NOISE_PATTERN)?,
            hyphen_break: Regex::new(HYPHEN_BREAK_PATTERN)?,
            whitespace: Regex::new(WHITESPACE_PATTERN)?,
            typos,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        let kept = text
            .split(is_line_break)
            .filter(|line| line.trim().chars().count() > self.min_line_chars)
            .collect::<Vec<_>>()
            .join("\n");

        let denoised = self.noise.replace_all(&kept, " ");
        let rejoined = self.hyphen_break.replace_all(&denoised, "${1}${2}");
        let collapsed = self.whitespace.replace_all(&rejoined, " ");
        collapsed.trim().to_string()
    }

    pub fn correct_typos(&self, text: &str) -> String {
        let mut corrected = text.to_string();
        for (pattern, replacement) in &self.typos {
            if pattern.is_match(&corrected) {
                corrected = pattern.replace_all(&corrected, *replacement).into_owned();
            }
        }
        corrected
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}'
            | '\u{2029}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> TextCleaner {
        TextCleaner::new(20).expect("patterns compile")
    }

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || ('\u{c0}'..='\u{ff}').contains(&c)
            || c.is_whitespace()
            || ",.;:!?'\"()-–—".contains(c)
    }

    #[test]
    fn short_lines_are_dropped() {
        let input = "12\nMINISTÉRIO\nO relatório descreve a reunião do conselho universitário.\n  x  ";
        let cleaned = cleaner().clean(input);
        assert_eq!(
            cleaned,
            "O relatório descreve a reunião do conselho universitário."
        );
    }

    #[test]
    fn line_of_exactly_threshold_length_is_dropped() {
        let twenty = "abcdefghijklmnopqrst";
        let twenty_one = "abcdefghijklmnopqrstu";
        assert_eq!(cleaner().clean(twenty), "");
        assert_eq!(cleaner().clean(twenty_one), twenty_one);
    }

    #[test]
    fn noise_bursts_collapse_to_a_space() {
        let input = "Documento confidencial ###@@ encaminhado à DSI ~~ hoje";
        let cleaned = cleaner().clean(input);
        assert_eq!(cleaned, "Documento confidencial encaminhado à DSI ~~ hoje");
    }

    #[test]
    fn no_disallowed_run_of_three_survives() {
        let input = "Texto com ruído §§§§ e mais ¤¤¤ símbolos @@@@@@ no meio da linha\n\
                     Segunda linha longa o bastante ¬¬¬¬ para ser mantida";
        let cleaned = cleaner().clean(input);

        let mut run = 0;
        for c in cleaned.chars() {
            run = if is_allowed(c) { 0 } else { run + 1 };
            assert!(run < 3, "noise run survived in {cleaned:?}");
        }
    }

    #[test]
    fn hyphenated_words_are_rejoined_across_lines() {
        let input = "O estudante participou da assem-\nbleia geral realizada no campus central";
        let cleaned = cleaner().clean(input);
        assert_eq!(
            cleaned,
            "O estudante participou da assembleia geral realizada no campus central"
        );
    }

    #[test]
    fn whitespace_runs_are_collapsed() {
        let input = "  Relatório    de\t\tatividades   do   departamento  \r\n";
        assert_eq!(cleaner().clean(input), "Relatório de atividades do departamento");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(cleaner().clean(""), "");
    }

    #[test]
    fn typo_dictionary_matches_whole_words_case_insensitively() {
        let corrected = cleaner().correct_typos("Qne o Homom da arto; qnes ficam");
        assert_eq!(corrected, "que o homem da arte; qnes ficam");
    }
}
