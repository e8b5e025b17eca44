use serde_json::{json, Map, Value};

pub const DEFAULT_EMBEDDER_NAME: &str = "documentos-openai";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DOCUMENT_TEMPLATE: &str = "Relatório histórico de segurança nacional ou universitária. \
Título: '{{doc.titulo}}'. Conteúdo: '{{doc.texto}}'";

#[derive(Debug, Clone)]
pub struct EmbedderSettings {
    pub name: String,
    pub source: String,
    pub model: String,
    pub document_template: String,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_EMBEDDER_NAME.to_string(),
            source: "openAi".to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            document_template: DEFAULT_DOCUMENT_TEMPLATE.to_string(),
        }
    }
}

impl EmbedderSettings {
    pub fn payload(&self, api_key: &str) -> Value {
        let mut embedders = Map::new();
        embedders.insert(
            self.name.clone(),
            json!({
                "source": self.source,
                "apiKey": api_key,
                "model": self.model,
                "documentTemplate": self.document_template,
            }),
        );
        Value::Object(embedders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_keyed_by_embedder_name() {
        let payload = EmbedderSettings::default().payload("sk-test");
        let embedder = &payload[DEFAULT_EMBEDDER_NAME];
        assert_eq!(embedder["source"], "openAi");
        assert_eq!(embedder["apiKey"], "sk-test");
        assert_eq!(embedder["model"], DEFAULT_EMBEDDING_MODEL);
        assert!(embedder["documentTemplate"]
            .as_str()
            .is_some_and(|template| template.contains("{{doc.texto}}")));
    }
}
