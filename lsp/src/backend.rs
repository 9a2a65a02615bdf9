//! LSP Backend implementation for SCL
//!
//! Only the text of each open document is kept. Every request runs the
//! matching core query against that text; nothing is cached between edits.

use std::collections::HashMap;
use std::sync::Arc;

use scl_core::{SclConfig, StepFactoryStore};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::convert;

/// Document state stored for each open file
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub content: String,
    pub version: i32,
}

impl DocumentState {
    pub fn new(content: String, version: i32) -> Self {
        Self { content, version }
    }

    pub fn update(&mut self, content: String, version: i32) {
        self.content = content;
        self.version = version;
    }
}

/// The SCL Language Server backend
pub struct SclBackend {
    client: Client,
    store: Arc<StepFactoryStore>,
    config: RwLock<SclConfig>,
    documents: Arc<RwLock<HashMap<Url, DocumentState>>>,
}

impl SclBackend {
    pub fn new(client: Client, store: Arc<StepFactoryStore>, config: SclConfig) -> Self {
        Self {
            client,
            store,
            config: RwLock::new(config),
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish diagnostics for a document
    async fn publish_diagnostics(&self, uri: Url) {
        let docs = self.documents.read().await;
        let Some(doc) = docs.get(&uri) else {
            return;
        };

        let source = self.config.read().await.diagnostics.source.clone();
        let diagnostics: Vec<Diagnostic> = scl_core::get_diagnostics(&doc.content, &self.store)
            .into_iter()
            .map(|d| convert::diagnostic(&doc.content, d, &source))
            .collect();
        debug!(%uri, count = diagnostics.len(), "publishing diagnostics");

        let version = doc.version;
        drop(docs);
        self.client
            .publish_diagnostics(uri, diagnostics, Some(version))
            .await;
    }

    /// Replace the configuration with editor settings; an `scl` section is
    /// used when present. Invalid settings keep the current configuration.
    async fn apply_settings(&self, settings: serde_json::Value) {
        let settings = match settings.get("scl") {
            Some(section) => section.clone(),
            None => settings,
        };
        match SclConfig::from_json(settings) {
            Ok(config) => {
                debug!(?config, "applied editor settings");
                *self.config.write().await = config;
            }
            Err(e) => {
                warn!(error = %e, "ignoring editor settings");
                self.client
                    .log_message(MessageType::WARNING, format!("Ignoring SCL settings: {}", e))
                    .await;
            }
        }
    }

    async fn publish_all(&self) {
        let uris: Vec<Url> = self.documents.read().await.keys().cloned().collect();
        for uri in uris {
            self.publish_diagnostics(uri).await;
        }
    }

    /// Run `query` against the text of an open document
    async fn with_document<T>(&self, uri: &Url, query: impl FnOnce(&str) -> T) -> Option<T> {
        let docs = self.documents.read().await;
        docs.get(uri).map(|doc| query(doc.content.as_str()))
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for SclBackend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(options) = params.initialization_options {
            self.apply_settings(options).await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        will_save: None,
                        will_save_wait_until: None,
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec!["<".to_string(), "[".to_string()]),
                    resolve_provider: Some(false),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: None,
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec![" ".to_string(), "(".to_string()]),
                    retrigger_characters: Some(vec![":".to_string()]),
                    work_done_progress_options: Default::default(),
                }),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "scl-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("client initialized");
        self.client
            .log_message(MessageType::INFO, "SCL language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        if params.settings.is_null() {
            return;
        }
        self.apply_settings(params.settings).await;
        self.publish_all().await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let doc = DocumentState::new(params.text_document.text, params.text_document.version);
        self.documents.write().await.insert(uri.clone(), doc);
        self.publish_diagnostics(uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // FULL sync: the last change holds the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            let mut docs = self.documents.write().await;
            if let Some(doc) = docs.get_mut(&uri) {
                doc.update(change.text, version);
            }
        }

        self.publish_diagnostics(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.write().await.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(text) = params.text {
            let uri = params.text_document.uri;
            let mut docs = self.documents.write().await;
            if let Some(doc) = docs.get_mut(&uri) {
                let version = doc.version;
                doc.update(text, version);
            }
            drop(docs);
            self.publish_diagnostics(uri).await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let max_items = self.config.read().await.completion.max_items;

        let list = self
            .with_document(&uri, |text| {
                let position = convert::line_position(text, position);
                let response = scl_core::get_completions(text, position, &self.store);
                let truncated = response.items.len() > max_items;
                let items = response
                    .items
                    .into_iter()
                    .take(max_items)
                    .map(|item| convert::completion_item(text, item))
                    .collect();
                CompletionList {
                    is_incomplete: response.is_incomplete || truncated,
                    items,
                }
            })
            .await;
        Ok(list.map(CompletionResponse::List))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let response = self
            .with_document(&uri, |text| {
                let position = convert::line_position(text, position);
                scl_core::get_hover(text, position, &self.store)
            })
            .await;
        Ok(response.and_then(convert::hover))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let response = self
            .with_document(&uri, |text| {
                let position = convert::line_position(text, position);
                scl_core::get_signature_help(text, position, &self.store)
            })
            .await;
        Ok(response.and_then(convert::signature_help))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let options = self.config.read().await.formatting_options();

        let edits: Option<Vec<TextEdit>> = self
            .with_document(&uri, |text| {
                scl_core::format_document(text, &self.store, options)
                    .into_iter()
                    .map(|edit| convert::text_edit(text, edit))
                    .collect()
            })
            .await;
        Ok(edits)
    }
}
