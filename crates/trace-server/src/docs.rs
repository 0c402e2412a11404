use serde::Serialize;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct EndpointDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

pub static ENDPOINT_TABLE: &[EndpointDoc] = &[
    EndpointDoc {
        method: "POST",
        path: "/api/analyze",
        description: "Analyze documents with natural language queries",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/timeline",
        description: "Extract timeline events from documents",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/exhibits",
        description: "Generate Cook County court exhibits",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/forms/fill",
        description: "Fill form templates with data",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/commands",
        description: "Execute analysis commands",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/emails/ingest",
        description: "Ingest emails for analysis",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/documents",
        description: "Index a document for semantic search",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/search",
        description: "Semantic search over indexed documents",
    },
    EndpointDoc {
        method: "POST",
        path: "/api/ai/generate",
        description: "Run a prompt through the AI inference binding",
    },
    EndpointDoc {
        method: "GET",
        path: "/health",
        description: "Health check endpoint",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/docs",
        description: "This endpoint catalog",
    },
];

pub const AUTHENTICATION_NOTE: &str =
    "Bearer token in Authorization header or apiKey in request body";
pub const UPSTREAM_NOTE: &str =
    "Analysis endpoints forward the resolved API key to the language model provider";

#[derive(Serialize)]
pub struct ApiDocs {
    pub title: String,
    pub version: String,
    pub endpoints: &'static [EndpointDoc],
    pub authentication: &'static str,
    pub note: &'static str,
}

impl ApiDocs {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            title: format!("{name} API"),
            version: version.to_string(),
            endpoints: ENDPOINT_TABLE,
            authentication: AUTHENTICATION_NOTE,
            note: UPSTREAM_NOTE,
        }
    }
}
