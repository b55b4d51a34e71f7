use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Species;
use crate::error::TxiError;
use crate::tx2gene::TranscriptGeneMap;

pub const DEFAULT_BIOMART_HOST: &str = "https://www.ensembl.org";

pub trait BiomartClient: Send + Sync {
    fn fetch_transcript_gene_map(&self, species: &Species) -> Result<TranscriptGeneMap, TxiError>;
}

#[derive(Clone)]
pub struct BiomartHttpClient {
    client: Client,
    host: String,
}

impl BiomartHttpClient {
    pub fn new() -> Result<Self, TxiError> {
        Self::with_host(DEFAULT_BIOMART_HOST)
    }

    pub fn with_host(host: &str) -> Result<Self, TxiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-txi/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TxiError::BiomartHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| TxiError::BiomartHttp(err.to_string()))?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    fn martservice_url(&self) -> String {
        format!("{}/biomart/martservice", self.host)
    }
}

impl BiomartClient for BiomartHttpClient {
    fn fetch_transcript_gene_map(&self, species: &Species) -> Result<TranscriptGeneMap, TxiError> {
        let query = transcript_gene_query(species.biomart_dataset());
        tracing::info!(dataset = species.biomart_dataset(), "querying BioMart");
        let response = self
            .client
            .get(self.martservice_url())
            .query(&[("query", query.as_str())])
            .send()
            .map_err(|err| TxiError::BiomartHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "BioMart request failed".to_string());
            return Err(TxiError::BiomartStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| TxiError::BiomartHttp(err.to_string()))?;
        parse_martservice_body(&body)
    }
}

pub fn transcript_gene_query(dataset: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?><!DOCTYPE Query>"#,
            r#"<Query virtualSchemaName="default" formatter="TSV" header="1" uniqueRows="1" datasetConfigVersion="0.6">"#,
            r#"<Dataset name="{dataset}" interface="default">"#,
            r#"<Attribute name="ensembl_transcript_id"/>"#,
            r#"<Attribute name="ensembl_gene_id"/>"#,
            r#"</Dataset></Query>"#
        ),
        dataset = dataset
    )
}

pub fn parse_martservice_body(body: &str) -> Result<TranscriptGeneMap, TxiError> {
    let head = body.trim_start();
    let rejected = ["Query ERROR", "<html", "<!DOCTYPE"];
    if rejected.iter().any(|prefix| head.starts_with(prefix)) {
        let message = head.lines().next().unwrap_or_default().to_string();
        return Err(TxiError::BiomartHttp(message));
    }
    TranscriptGeneMap::from_reader(body.as_bytes())
}
