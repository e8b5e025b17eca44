use crate::traits::{ChatModel, SearchEngine};
use crate::{ChatMessage, SearchError, SearchHit, SearchRequest, DEFAULT_EMBEDDER_NAME};
use tracing::{debug, info};

pub const NOT_FOUND_MESSAGE: &str =
    "Não encontrei documentos que se encaixem bem nessa descrição.";

const REWRITE_PROMPT: &str = "Você é um assistente especializado em documentos do Arquivo Nacional. \
Transforme a pergunta do usuário em termos de busca para um índice semântico de documentos. \
Seja conciso, use apenas palavras-chave contextuais e responda somente com a consulta gerada.\n\
Exemplo:\n\
Pergunta: \"Quero ver relatórios sobre espionagem de estudantes em Brasília.\"\n\
Resposta: relatórios espionagem estudantes Brasília";

const SUMMARY_SYSTEM_PROMPT: &str = "Você é um assistente de busca em acervo histórico, analítico e preciso.";

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub semantic_ratio: f32,
    pub limit: usize,
    pub embedder: String,
    pub rewrite_query: bool,
    pub summarize: bool,
    pub snippet_chars: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            semantic_ratio: 0.7,
            limit: 5,
            embedder: DEFAULT_EMBEDDER_NAME.to_string(),
            rewrite_query: true,
            summarize: true,
            snippet_chars: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    NotFound {
        query: String,
        message: String,
    },
    Found {
        query: String,
        summary: Option<String>,
        hits: Vec<SearchHit>,
    },
}

impl Answer {
    pub fn query(&self) -> &str {
        match self {
            Self::NotFound { query, .. } | Self::Found { query, .. } => query,
        }
    }
}

pub struct SearchCoordinator<'a, E: SearchEngine + ?Sized> {
    engine: &'a E,
    chat: Option<&'a dyn ChatModel>,
    options: QueryOptions,
}

impl<'a, E: SearchEngine + ?Sized> SearchCoordinator<'a, E> {
    pub fn new(engine: &'a E, chat: Option<&'a dyn ChatModel>, options: QueryOptions) -> Self {
        Self {
            engine,
            chat,
            options,
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub async fn full_text(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.engine
            .search(&SearchRequest::full_text(text, limit))
            .await
    }

    pub async fn hybrid(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.engine
            .search(&SearchRequest::hybrid(
                text,
                limit,
                self.options.semantic_ratio,
                &self.options.embedder,
            ))
            .await
    }

    pub async fn search(
        &self,
        text: &str,
        limit: usize,
        hybrid: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if hybrid {
            self.hybrid(text, limit).await
        } else {
            self.full_text(text, limit).await
        }
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, SearchError> {
        if question.trim().is_empty() {
            return Err(SearchError::Request("question is empty".to_string()));
        }

        let query = self.rewrite(question).await?;
        info!(%query, "searching");

        let hits = self.hybrid(&query, self.options.limit).await?;
        if hits.is_empty() {
            return Ok(Answer::NotFound {
                query,
                message: NOT_FOUND_MESSAGE.to_string(),
            });
        }

        let summary = match self.chat {
            Some(chat) if self.options.summarize => {
                let prompt = summary_prompt(question, &hits, self.options.snippet_chars);
                Some(
                    chat.complete(&[
                        ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                        ChatMessage::user(prompt),
                    ])
                    .await?,
                )
            }
            _ => None,
        };

        Ok(Answer::Found {
            query,
            summary,
            hits,
        })
    }

    async fn rewrite(&self, question: &str) -> Result<String, SearchError> {
        let chat = match self.chat {
            Some(chat) if self.options.rewrite_query => chat,
            _ => return Ok(question.trim().to_string()),
        };

        let rewritten = chat
            .complete(&[ChatMessage::system(REWRITE_PROMPT), ChatMessage::user(question)])
            .await?;
        let rewritten = rewritten.trim().trim_matches('"').trim();

        if rewritten.is_empty() {
            debug!("rewrite came back blank, using the question as typed");
            return Ok(question.trim().to_string());
        }
        Ok(rewritten.to_string())
    }
}

pub fn summary_prompt(question: &str, hits: &[SearchHit], snippet_chars: usize) -> String {
    let context = hits
        .iter()
        .map(|hit| {
            format!(
                "Título: {}\nTrecho: {}...",
                hit.citation(),
                hit.snippet(snippet_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Pergunta do usuário: {question}\n\
         Documentos correspondentes:\n{context}\n\n\
         Responda de forma curta e objetiva, apenas confirmando que foram encontrados documentos \
         relacionados ao tema solicitado. Liste ou mencione brevemente os principais títulos, \
         sem interpretar o conteúdo nem adicionar contexto histórico."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::tests::FakeEngine;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedChat {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedChat {
        fn with_replies(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().map(|prompts| prompts.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, SearchError> {
            self.prompts.lock().expect("lock").push(messages.to_vec());
            Ok(self
                .replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_default())
        }
    }

    fn hit(title: &str, ordinal: u32, text: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            document: title.replace(' ', "_"),
            chunk_ordinal: Some(ordinal),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn no_hits_yield_not_found_without_summarizing() -> Result<(), SearchError> {
        let engine = FakeEngine::default();
        let chat = ScriptedChat::with_replies(&["espionagem estudantes"]);
        let coordinator = SearchCoordinator::new(&engine, Some(&chat), QueryOptions::default());

        let answer = coordinator.ask("Quem espionava estudantes?").await?;

        assert_eq!(
            answer,
            Answer::NotFound {
                query: "espionagem estudantes".to_string(),
                message: NOT_FOUND_MESSAGE.to_string(),
            }
        );
        assert_eq!(chat.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn rewritten_query_drives_a_hybrid_search() -> Result<(), SearchError> {
        let engine = FakeEngine {
            hits: vec![hit("Informe DSI", 3, "Relatório sobre a UnB")],
            ..FakeEngine::default()
        };
        let chat = ScriptedChat::with_replies(&["\"vigilância UnB\"", "Foi encontrado o Informe DSI."]);
        let coordinator = SearchCoordinator::new(&engine, Some(&chat), QueryOptions::default());

        let answer = coordinator.ask("O que havia sobre a UnB?").await?;

        let Answer::Found { query, summary, hits } = answer else {
            panic!("expected hits");
        };
        assert_eq!(query, "vigilância UnB");
        assert_eq!(summary.as_deref(), Some("Foi encontrado o Informe DSI."));
        assert_eq!(hits.len(), 1);

        let searches = engine.searches.lock().expect("lock").clone();
        assert_eq!(
            searches,
            vec![SearchRequest::hybrid("vigilância UnB", 5, 0.7, DEFAULT_EMBEDDER_NAME)]
        );

        let prompts = chat.prompts.lock().expect("lock").clone();
        assert!(prompts[1][1].content.contains("Informe DSI (p.3)"));
        Ok(())
    }

    #[tokio::test]
    async fn without_a_model_the_question_is_searched_as_typed() -> Result<(), SearchError> {
        let engine = FakeEngine {
            hits: vec![hit("Ata", 1, "texto")],
            ..FakeEngine::default()
        };
        let coordinator = SearchCoordinator::new(&engine, None, QueryOptions::default());

        let answer = coordinator.ask("  greve estudantil ").await?;

        assert_eq!(answer.query(), "greve estudantil");
        assert!(matches!(answer, Answer::Found { summary: None, .. }));
        Ok(())
    }

    #[tokio::test]
    async fn blank_rewrite_falls_back_to_the_question() -> Result<(), SearchError> {
        let engine = FakeEngine::default();
        let chat = ScriptedChat::with_replies(&["   "]);
        let coordinator = SearchCoordinator::new(&engine, Some(&chat), QueryOptions::default());

        let answer = coordinator.ask("censura MEC").await?;
        assert_eq!(answer.query(), "censura MEC");
        Ok(())
    }

    #[tokio::test]
    async fn empty_question_is_rejected() {
        let engine = FakeEngine::default();
        let coordinator = SearchCoordinator::new(&engine, None, QueryOptions::default());
        assert!(coordinator.ask("   ").await.is_err());
    }

    #[tokio::test]
    async fn search_picks_the_mode() -> Result<(), SearchError> {
        let engine = FakeEngine::default();
        let coordinator = SearchCoordinator::new(&engine, None, QueryOptions::default());

        coordinator.search("ditadura", 3, false).await?;
        coordinator.search("ditadura", 2, true).await?;

        let searches = engine.searches.lock().expect("lock").clone();
        assert_eq!(
            searches,
            vec![
                SearchRequest::full_text("ditadura", 3),
                SearchRequest::hybrid("ditadura", 2, 0.7, DEFAULT_EMBEDDER_NAME),
            ]
        );
        Ok(())
    }

    #[test]
    fn summary_prompt_truncates_snippets() {
        let long = "a".repeat(1_000);
        let prompt = summary_prompt("pergunta", &[hit("Memorando", 7, &long)], 400);

        assert!(prompt.contains("Título: Memorando (p.7)"));
        assert!(prompt.contains(&format!("Trecho: {}...", "a".repeat(400))));
        assert!(!prompt.contains(&"a".repeat(401)));
    }
}
