//! Prompt templates and schema checks around a [`CompletionModel`].
//!
//! Both operations are stateless: one round trip per call, nothing is
//! cached or stored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CompletionModel, CompletionRequest, InsightError};

const SUMMARY_SYSTEM: &str = "Você é um analista de patrimônio. Responda em português do Brasil, \
em texto corrido, sem listas e sem markdown.";

const ANOMALY_SYSTEM: &str = "Você audita inventários de bens. Aponte itens com valor incoerente \
para o tipo de bem (anomaly_type \"value\") ou com local suspeito ou ausente (anomaly_type \
\"location\"). Responda somente com um objeto JSON no formato \
{\"anomalies\":[{\"code_id\":\"...\",\"anomaly_type\":\"value\",\"description\":\"...\"}]}. \
Escreva as descrições em português do Brasil. Use uma lista vazia quando não houver anomalias.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Aggregates the narrative summary is written from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub total_assets: usize,
    /// In reais.
    pub total_value: f64,
    pub category_count: usize,
    pub location_count: usize,
    pub value_by_category: Vec<SeriesPoint>,
    pub assets_by_city: Vec<SeriesPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyInput {
    pub name: String,
    pub code_id: String,
    pub city: String,
    pub value: f64,
    pub observation: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyType {
    Value,
    Location,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(alias = "codeId")]
    pub code_id: String,
    #[serde(alias = "anomalyType")]
    pub anomaly_type: AnomalyType,
    pub description: String,
}

#[derive(Deserialize)]
struct AnomalyReply {
    anomalies: Vec<Anomaly>,
}

pub struct Analyst {
    model: Arc<dyn CompletionModel>,
}

impl Analyst {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Portuguese executive summary of the dashboard aggregates.
    pub async fn summarize(&self, request: &SummaryRequest) -> Result<String, InsightError> {
        validate_summary(request)?;
        let prompt = CompletionRequest {
            system: SUMMARY_SYSTEM.to_string(),
            user: summary_prompt(request),
            json: false,
        };
        tracing::debug!(total_assets = request.total_assets, "requesting summary");
        let text = self.model.complete(&prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(InsightError::InvalidOutput("empty summary".to_string()));
        }
        Ok(text.to_string())
    }

    /// Flag suspicious items. An empty result means nothing was found.
    pub async fn detect_anomalies(
        &self,
        items: &[AnomalyInput],
    ) -> Result<Vec<Anomaly>, InsightError> {
        validate_items(items)?;
        let prompt = CompletionRequest {
            system: ANOMALY_SYSTEM.to_string(),
            user: serde_json::to_string_pretty(items)
                .map_err(|err| InsightError::InvalidInput(err.to_string()))?,
            json: true,
        };
        tracing::debug!(items = items.len(), "requesting anomaly detection");
        let raw = self.model.complete(&prompt).await?;
        parse_anomalies(&raw, items)
    }
}

fn validate_summary(request: &SummaryRequest) -> Result<(), InsightError> {
    if !request.total_value.is_finite() || request.total_value < 0.0 {
        return Err(InsightError::InvalidInput(
            "total_value must be a non-negative number".to_string(),
        ));
    }
    for point in request
        .value_by_category
        .iter()
        .chain(request.assets_by_city.iter())
    {
        if point.label.trim().is_empty() {
            return Err(InsightError::InvalidInput(
                "chart labels must not be empty".to_string(),
            ));
        }
        if !point.value.is_finite() || point.value < 0.0 {
            return Err(InsightError::InvalidInput(format!(
                "invalid value for '{}'",
                point.label
            )));
        }
    }
    Ok(())
}

fn validate_items(items: &[AnomalyInput]) -> Result<(), InsightError> {
    if items.is_empty() {
        return Err(InsightError::InvalidInput(
            "no items to analyze".to_string(),
        ));
    }
    if let Some(item) = items.iter().find(|item| item.code_id.trim().is_empty()) {
        return Err(InsightError::InvalidInput(format!(
            "item '{}' has no code_id",
            item.name
        )));
    }
    Ok(())
}

fn summary_prompt(request: &SummaryRequest) -> String {
    let mut lines = vec![
        "Escreva um resumo executivo curto, de no máximo três parágrafos, sobre o inventário abaixo. \
         Destaque concentrações de valor e a distribuição dos itens por local."
            .to_string(),
        format!("Total de itens ativos: {}", request.total_assets),
        format!("Valor total: R$ {:.2}", request.total_value),
        format!("Categorias cadastradas: {}", request.category_count),
        format!("Locais cadastrados: {}", request.location_count),
        "Valor por categoria:".to_string(),
    ];
    lines.extend(
        request
            .value_by_category
            .iter()
            .map(|point| format!("- {}: R$ {:.2}", point.label, point.value)),
    );
    lines.push("Itens por local:".to_string());
    lines.extend(
        request
            .assets_by_city
            .iter()
            .map(|point| format!("- {}: {}", point.label, point.value)),
    );
    lines.join("\n")
}

/// Models often wrap JSON in a markdown fence.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_anomalies(raw: &str, items: &[AnomalyInput]) -> Result<Vec<Anomaly>, InsightError> {
    let reply: AnomalyReply = serde_json::from_str(strip_fence(raw))?;
    for anomaly in &reply.anomalies {
        if !items.iter().any(|item| item.code_id == anomaly.code_id) {
            return Err(InsightError::InvalidOutput(format!(
                "unknown code_id '{}'",
                anomaly.code_id
            )));
        }
        if anomaly.description.trim().is_empty() {
            return Err(InsightError::InvalidOutput(format!(
                "empty description for '{}'",
                anomaly.code_id
            )));
        }
    }
    Ok(reply.anomalies)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct FakeModel {
        reply: Result<String, u16>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeModel {
        fn answering(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for FakeModel {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, InsightError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(InsightError::Status {
                    status: *status,
                    body: "boom".to_string(),
                }),
            }
        }
    }

    fn summary_request() -> SummaryRequest {
        SummaryRequest {
            total_assets: 2,
            total_value: 5200.5,
            category_count: 1,
            location_count: 2,
            value_by_category: vec![SeriesPoint {
                label: "Informática".to_string(),
                value: 5200.5,
            }],
            assets_by_city: vec![
                SeriesPoint {
                    label: "SP".to_string(),
                    value: 1.0,
                },
                SeriesPoint {
                    label: "Rio".to_string(),
                    value: 1.0,
                },
            ],
        }
    }

    fn item(code: &str) -> AnomalyInput {
        AnomalyInput {
            name: "Notebook".to_string(),
            code_id: code.to_string(),
            city: "SP".to_string(),
            value: 4500.0,
            observation: None,
        }
    }

    #[tokio::test]
    async fn summary_prompt_carries_the_aggregates() {
        let model = FakeModel::answering("  O inventário está concentrado em Informática.  ");
        let analyst = Analyst::new(model.clone());

        let text = analyst.summarize(&summary_request()).await.unwrap();
        assert_eq!(text, "O inventário está concentrado em Informática.");

        let seen = model.seen.lock().unwrap();
        assert!(!seen[0].json);
        assert!(seen[0].user.contains("Valor total: R$ 5200.50"));
        assert!(seen[0].user.contains("- Informática: R$ 5200.50"));
        assert!(seen[0].user.contains("- Rio: 1"));
        assert!(seen[0].user.ends_with("Itens por local:\n- SP: 1\n- Rio: 1"));
    }

    #[tokio::test]
    async fn blank_summary_is_a_failure() {
        let analyst = Analyst::new(FakeModel::answering("   "));
        assert!(matches!(
            analyst.summarize(&summary_request()).await,
            Err(InsightError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn summary_rejects_blank_labels_before_calling_the_model() {
        let model = FakeModel::answering("ok");
        let analyst = Analyst::new(model.clone());
        let mut request = summary_request();
        request.assets_by_city[0].label = " ".to_string();

        assert!(matches!(
            analyst.summarize(&request).await,
            Err(InsightError::InvalidInput(_))
        ));
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn anomalies_are_parsed_from_fenced_json() {
        let reply = "```json\n{\"anomalies\":[{\"codeId\":\"NTB-001\",\"anomalyType\":\"value\",\
                     \"description\":\"Valor alto para um mouse.\"}]}\n```";
        let analyst = Analyst::new(FakeModel::answering(reply));

        let anomalies = analyst.detect_anomalies(&[item("NTB-001")]).await.unwrap();
        assert_eq!(
            anomalies,
            vec![Anomaly {
                code_id: "NTB-001".to_string(),
                anomaly_type: AnomalyType::Value,
                description: "Valor alto para um mouse.".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn empty_anomaly_list_is_not_an_error() {
        let analyst = Analyst::new(FakeModel::answering("{\"anomalies\": []}"));
        let anomalies = analyst.detect_anomalies(&[item("A-1")]).await.unwrap();
        assert!(anomalies.is_empty());
    }

    #[tokio::test]
    async fn malformed_anomaly_output_fails_the_request() {
        for reply in [
            "nada encontrado",
            "{\"anomalies\":[{\"code_id\":\"A-1\",\"anomaly_type\":\"price\",\"description\":\"x\"}]}",
            "{\"anomalies\":[{\"code_id\":\"Z-9\",\"anomaly_type\":\"value\",\"description\":\"x\"}]}",
        ] {
            let analyst = Analyst::new(FakeModel::answering(reply));
            assert!(
                matches!(
                    analyst.detect_anomalies(&[item("A-1")]).await,
                    Err(InsightError::InvalidOutput(_))
                ),
                "{reply}"
            );
        }
    }

    #[tokio::test]
    async fn anomaly_input_is_validated() {
        let analyst = Analyst::new(FakeModel::answering("{\"anomalies\": []}"));
        assert!(matches!(
            analyst.detect_anomalies(&[]).await,
            Err(InsightError::InvalidInput(_))
        ));
        assert!(matches!(
            analyst.detect_anomalies(&[item(" ")]).await,
            Err(InsightError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn model_failures_propagate() {
        let analyst = Analyst::new(FakeModel::failing(500));
        assert!(matches!(
            analyst.detect_anomalies(&[item("A-1")]).await,
            Err(InsightError::Status { status: 500, .. })
        ));
    }
}
