use crate::domain::{Parameter, SiteCode};
use crate::error::HydroError;

pub const GRAPH_URI: &str = "https://lindas.admin.ch/foen/hydro";

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
}

impl QueryBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn observation_uri(&self, site: SiteCode) -> String {
        format!("{}/river/observation/{site}", self.base_url)
    }

    pub fn site_query(
        &self,
        site: SiteCode,
        parameters: &[Parameter],
    ) -> Result<String, HydroError> {
        if parameters.is_empty() {
            return Err(HydroError::EmptyParameters);
        }

        // De-duplicate while preserving first-seen order.
        let mut requested: Vec<Parameter> = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            if !requested.contains(parameter) {
                requested.push(*parameter);
            }
        }

        let params_filter = requested
            .iter()
            .map(|parameter| format!("<{}>", parameter.dimension_uri(&self.base_url)))
            .collect::<Vec<_>>()
            .join(",\n    ");

        Ok(format!(
            "\
PREFIX schema: <http://schema.org/>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT ?predicate ?object
FROM <{GRAPH_URI}>
WHERE {{
  VALUES ?subject {{
    <{subject}>
  }}
  ?subject ?predicate ?object .
  FILTER (?predicate IN (
    {params_filter}
  ))
}}
",
            subject = self.observation_uri(site),
        ))
    }
}
