//! Route mocks: content requests fulfilled from fixtures

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::fixture::Fixtures;
use crate::language::Language;
use crate::playwright::js_str;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMock {
    /// Playwright URL glob, e.g. `**/assets/json/reading.json`
    pub url: String,

    /// Fixture to serve, by language code or file stem
    #[serde(default)]
    pub fixture: Option<String>,

    /// Inline JSON body, when no fixture is named
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    #[serde(default = "default_status")]
    pub status: u16,

    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_status() -> u16 {
    200
}

fn default_content_type() -> String {
    "application/json".to_string()
}

impl RouteMock {
    /// Mock serving the fixture of `lang` on its content path
    pub fn for_language(lang: Language) -> Self {
        Self {
            url: lang.route_glob(),
            fixture: Some(lang.code().to_string()),
            body: None,
            status: default_status(),
            content_type: default_content_type(),
        }
    }

    /// One mock per language
    pub fn reading_routes() -> Vec<Self> {
        Language::ALL.into_iter().map(Self::for_language).collect()
    }

    /// Serialized response body
    pub fn resolve_body(&self, fixtures: Option<&Fixtures>) -> E2eResult<String> {
        match (&self.fixture, &self.body) {
            (Some(name), None) => {
                let fixtures = fixtures.ok_or_else(|| {
                    E2eError::Fixture(format!("route {} needs fixtures but none are loaded", self.url))
                })?;
                Ok(serde_json::to_string(fixtures.by_name(name)?.raw())?)
            }
            (None, Some(body)) => Ok(serde_json::to_string(body)?),
            _ => Err(E2eError::SpecParse(format!(
                "route {} must name exactly one of fixture or body",
                self.url
            ))),
        }
    }

    /// `page.route` registration
    pub fn to_js(&self, fixtures: Option<&Fixtures>) -> E2eResult<String> {
        let body = self.resolve_body(fixtures)?;
        Ok(format!(
            "    await page.route({url}, (route) => route.fulfill({{ status: {status}, contentType: {ct}, body: {body} }}));",
            url = js_str(&self.url),
            status = self.status,
            ct = js_str(&self.content_type),
            body = js_str(&body),
        ))
    }
}
