use crate::error::IngestError;
use crate::models::PreprocessOptions;
use regex::Regex;

const HEADING_PATTERN: &str = r"\n([A-ZÀ-Ý\s]{4,}[:!?.\-])";

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub threshold_chars: usize,
    pub short_chunk_chars: usize,
    pub overlap_chars: usize,
}

impl From<&PreprocessOptions> for ChunkingConfig {
    fn from(value: &PreprocessOptions) -> Self {
        Self {
            threshold_chars: value.section_threshold_chars,
            short_chunk_chars: value.short_chunk_chars,
            overlap_chars: value.overlap_chars,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&PreprocessOptions::default())
    }
}

pub struct Chunker {
    config: ChunkingConfig,
    heading: Regex,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        Ok(Self {
            config,
            heading: Regex::new(HEADING_PATTERN)?,
        })
    }

    pub fn chunk_pages(&self, pages: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();

        for (index, text) in pages.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }

            let mut buffer = String::new();
            for section in self.split_sections(text) {
                let section = section.trim();
                if section.is_empty() {
                    continue;
                }

                buffer.push(' ');
                buffer.push_str(section);

                if buffer.chars().count() > self.config.threshold_chars {
                    let mut combined = buffer.trim().to_string();
                    if self.config.overlap_chars > 0
                        && index > 0
                        && combined.chars().count() < self.config.short_chunk_chars
                    {
                        let tail = tail_chars(&pages[index - 1], self.config.overlap_chars);
                        combined = format!("{tail} {combined}");
                    }
                    chunks.push(combined);
                    buffer.clear();
                }
            }

            let rest = buffer.trim();
            if !rest.is_empty() {
                chunks.push(rest.to_string());
            }
        }

        chunks
    }

    pub fn split_sections<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sections = Vec::new();
        let mut cursor = 0;

        for captures in self.heading.captures_iter(text) {
            let Some(heading) = captures.get(1) else {
                continue;
            };
            sections.push(&text[cursor..heading.start()]);
            sections.push(heading.as_str());
            cursor = heading.end();
        }

        sections.push(&text[cursor..]);
        sections
    }
}

pub fn tail_chars(text: &str, count: usize) -> &str {
    let total = text.chars().count();
    if total <= count {
        return text;
    }
    let skip = total - count;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(threshold: usize, short: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig {
            threshold_chars: threshold,
            short_chunk_chars: short,
            overlap_chars: overlap,
        })
        .expect("pattern compiles")
    }

    fn words(count: usize) -> String {
        (0..count)
            .map(|index| format!("palavra{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn page_without_headings_stays_one_oversized_chunk() {
        let page = words(300);
        assert!(page.chars().count() > 800);

        let chunks = chunker(800, 400, 200).chunk_pages(&[page.clone()]);
        assert_eq!(chunks, vec![page]);
    }

    #[test]
    fn headings_split_sections() {
        let text = "abertura do texto\nCONCLUSÃO: o conselho decidiu\nANEXO. lista";
        let sections = chunker(800, 400, 0).split_sections(text);
        assert_eq!(
            sections,
            vec![
                "abertura do texto\n",
                "CONCLUSÃO:",
                " o conselho decidiu\n",
                "ANEXO.",
                " lista"
            ]
        );
    }

    #[test]
    fn heading_at_start_of_text_is_not_a_break() {
        let sections = chunker(800, 400, 0).split_sections("RELATÓRIO: sem quebra");
        assert_eq!(sections, vec!["RELATÓRIO: sem quebra"]);
    }

    #[test]
    fn buffer_closes_once_threshold_is_exceeded() {
        let first = "a".repeat(30);
        let second = "b".repeat(30);
        let page = format!("{first}\nSECAO: {second}\nOUTRA: fim");

        let chunks = chunker(40, 0, 0).chunk_pages(&[page]);
        assert_eq!(
            chunks,
            vec![format!("{first} SECAO: {second}"), "OUTRA: fim".to_string()]
        );
    }

    #[test]
    fn short_closed_chunk_borrows_previous_page_tail() {
        let previous = format!("{}FIM", "x".repeat(10));
        let page = "\nTITULO: conteudo curto".to_string();

        let chunks = chunker(5, 400, 3).chunk_pages(&[previous.clone(), page]);
        assert_eq!(chunks[0], previous);
        assert_eq!(chunks[1], "FIM TITULO:");
        assert_eq!(chunks[2], "FIM conteudo curto");
    }

    #[test]
    fn overlap_comes_from_previous_page_and_only_for_short_chunks() {
        let pages = vec![
            "abc\nTITULO: xyzLAST".to_string(),
            "\nLONGO: 0123456789012345".to_string(),
        ];

        let chunks = chunker(5, 10, 3).chunk_pages(&pages);

        assert_eq!(
            chunks,
            vec!["abc TITULO:", "xyzLAST", "AST LONGO:", "0123456789012345"]
        );
    }

    #[test]
    fn first_page_never_gets_overlap() {
        let chunks = chunker(5, 400, 3).chunk_pages(&["\nTITULO: conteudo".to_string()]);
        assert_eq!(chunks, vec!["TITULO:".to_string(), "conteudo".to_string()]);
    }

    #[test]
    fn blank_pages_are_skipped() {
        let chunks = chunker(800, 400, 200).chunk_pages(&["   ".to_string(), "texto".to_string()]);
        assert_eq!(chunks, vec!["texto".to_string()]);
    }

    #[test]
    fn tail_chars_counts_characters_not_bytes() {
        assert_eq!(tail_chars("ação", 2), "ão");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("abc", 0), "");
    }
}
