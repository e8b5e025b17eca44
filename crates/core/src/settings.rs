use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum IndexSetting {
    FilterableAttributes(Vec<String>),
    SearchableAttributes(Vec<String>),
    DisplayedAttributes(Vec<String>),
    RankingRules(Vec<String>),
    Synonyms(BTreeMap<String, Vec<String>>),
}

impl IndexSetting {
    pub fn route(&self) -> &'static str {
        match self {
            Self::FilterableAttributes(_) => "filterable-attributes",
            Self::SearchableAttributes(_) => "searchable-attributes",
            Self::DisplayedAttributes(_) => "displayed-attributes",
            Self::RankingRules(_) => "ranking-rules",
            Self::Synonyms(_) => "synonyms",
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::FilterableAttributes(values)
            | Self::SearchableAttributes(values)
            | Self::DisplayedAttributes(values)
            | Self::RankingRules(values) => json!(values),
            Self::Synonyms(table) => json!(table),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub filterable: Vec<String>,
    pub searchable: Vec<String>,
    pub displayed: Vec<String>,
    pub ranking_rules: Vec<String>,
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl IndexSettings {
    pub fn updates(&self) -> Vec<IndexSetting> {
        vec![
            IndexSetting::FilterableAttributes(self.filterable.clone()),
            IndexSetting::SearchableAttributes(self.searchable.clone()),
            IndexSetting::DisplayedAttributes(self.displayed.clone()),
            IndexSetting::RankingRules(self.ranking_rules.clone()),
            IndexSetting::Synonyms(self.synonyms.clone()),
        ]
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for IndexSettings {
    fn default() -> Self {
        let synonyms = [
            ("comunista", &["subversivo", "infiltrado", "agitador"][..]),
            ("unb", &["universidade de brasilia", "unb"][..]),
            ("estudantil", &["movimento estudantil", "alunos", "greve"][..]),
            ("segurança", &["dsi", "asi", "informações", "espionagem"][..]),
            ("documento", &["informe", "relatório", "memorando"][..]),
            ("mec", &["ministerio da educacao", "educacao e cultura"][..]),
        ]
        .into_iter()
        .map(|(word, alternatives)| (word.to_string(), strings(alternatives)))
        .collect();

        Self {
            filterable: strings(&["documento", "pagina", "titulo", "length"]),
            searchable: strings(&["texto", "titulo"]),
            displayed: strings(&["titulo", "documento", "pagina", "texto"]),
            ranking_rules: strings(&[
                "words",
                "typo",
                "proximity",
                "attribute",
                "exactness",
                "sort",
                "length:desc",
            ]),
            synonyms,
        }
    }
}
