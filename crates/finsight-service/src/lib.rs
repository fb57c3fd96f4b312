pub mod answer;
pub mod chats;
pub mod projects;
pub mod url;

mod error;

pub use self::{
	answer::{ChatEvent, PreparedAnswer, SendMessageRequest},
	chats::{ChatDetailResponse, ChatResponse, CreateChatRequest, MessageResponse},
	error::{Error, Result},
	projects::{
		CreateProjectRequest, DocumentResponse, JobDetailResponse, JobSummary, ProjectDetailResponse,
		ProjectListResponse, ProjectResponse, ProjectStatusResponse, SnapshotResponse,
	},
};

use std::{collections::BTreeMap, future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

use finsight_config::{
	BlobStore, Config, EmbeddingProviderConfig, LlmProviderConfig, Scrape as ScrapeConfig,
};
use finsight_providers::scrape::PdfLink;
use finsight_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// One in-flight token stream from the chat model. Pull-based so callers can interleave
/// cancellation checks with delivery.
pub trait TokenSource
where
	Self: Send,
{
	fn next_token<'a>(&'a mut self) -> BoxFuture<'a, Option<Result<String>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn stream_chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Box<dyn TokenSource>>>;
}

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>>;
}

pub trait PageTextProvider
where
	Self: Send + Sync,
{
	fn extract_pages<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		pdf_base64: &'a str,
		filename: &'a str,
	) -> BoxFuture<'a, Result<BTreeMap<i32, String>>>;
}

pub trait ScrapeProvider
where
	Self: Send + Sync,
{
	fn scrape_report_links<'a>(
		&'a self,
		cfg: &'a ScrapeConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Vec<PdfLink>>>;

	fn download_pdf<'a>(
		&'a self,
		cfg: &'a ScrapeConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Vec<u8>>>;
}

pub trait BlobStoreProvider
where
	Self: Send + Sync,
{
	fn upload_pdf<'a>(
		&'a self,
		cfg: &'a BlobStore,
		pdf: Vec<u8>,
		public_id: &'a str,
	) -> BoxFuture<'a, Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
	pub page_text: Arc<dyn PageTextProvider>,
	pub scrape: Arc<dyn ScrapeProvider>,
	pub blob: Arc<dyn BlobStoreProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		chat: Arc<dyn ChatProvider>,
		extractor: Arc<dyn ExtractorProvider>,
		page_text: Arc<dyn PageTextProvider>,
		scrape: Arc<dyn ScrapeProvider>,
		blob: Arc<dyn BlobStoreProvider>,
	) -> Self {
		Self { embedding, chat, extractor, page_text, scrape, blob }
	}

	pub fn http() -> Self {
		Self {
			embedding: Arc::new(HttpEmbedding),
			chat: Arc::new(HttpChat),
			extractor: Arc::new(HttpExtractor),
			page_text: Arc::new(HttpPageText),
			scrape: Arc::new(HttpScrape),
			blob: Arc::new(HttpBlobStore),
		}
	}
}

pub struct HttpEmbedding;
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(finsight_providers::embedding::embed(cfg, texts).await?) })
	}
}

pub struct HttpChat;
impl ChatProvider for HttpChat {
	fn stream_chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Box<dyn TokenSource>>> {
		Box::pin(async move {
			let stream = finsight_providers::chat::stream_chat(cfg, messages).await?;

			Ok(Box::new(HttpTokenSource { inner: stream }) as Box<dyn TokenSource>)
		})
	}
}

struct HttpTokenSource {
	inner: finsight_providers::chat::TokenStream,
}
impl TokenSource for HttpTokenSource {
	fn next_token<'a>(&'a mut self) -> BoxFuture<'a, Option<Result<String>>> {
		Box::pin(async move {
			match self.inner.next_token().await {
				Some(Ok(token)) => Some(Ok(token)),
				Some(Err(err)) => Some(Err(err.into())),
				None => None,
			}
		})
	}
}

pub struct HttpExtractor;
impl ExtractorProvider for HttpExtractor {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move { Ok(finsight_providers::extractor::extract(cfg, messages).await?) })
	}
}

pub struct HttpPageText;
impl PageTextProvider for HttpPageText {
	fn extract_pages<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		pdf_base64: &'a str,
		filename: &'a str,
	) -> BoxFuture<'a, Result<BTreeMap<i32, String>>> {
		Box::pin(async move {
			Ok(finsight_providers::pagetext::extract_pages(cfg, pdf_base64, filename).await?)
		})
	}
}

pub struct HttpScrape;
impl ScrapeProvider for HttpScrape {
	fn scrape_report_links<'a>(
		&'a self,
		cfg: &'a ScrapeConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Vec<PdfLink>>> {
		Box::pin(async move {
			let html = finsight_providers::scrape::fetch_page(cfg, url).await?;

			Ok(finsight_providers::scrape::find_report_links(&html))
		})
	}

	fn download_pdf<'a>(
		&'a self,
		cfg: &'a ScrapeConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Vec<u8>>> {
		Box::pin(async move { Ok(finsight_providers::scrape::download_pdf(cfg, url).await?) })
	}
}

pub struct HttpBlobStore;
impl BlobStoreProvider for HttpBlobStore {
	fn upload_pdf<'a>(
		&'a self,
		cfg: &'a BlobStore,
		pdf: Vec<u8>,
		public_id: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(finsight_providers::blobstore::upload_pdf(cfg, pdf, public_id).await?) })
	}
}

pub struct FinsightService {
	pub cfg: Arc<Config>,
	pub db: Db,
	pub providers: Providers,
	#[cfg(feature = "test-hooks")]
	pub last_knn_scope: std::sync::Mutex<Option<Vec<Uuid>>>,
}
impl FinsightService {
	pub fn new(cfg: Arc<Config>, db: Db, providers: Providers) -> Self {
		Self {
			cfg,
			db,
			providers,
			#[cfg(feature = "test-hooks")]
			last_knn_scope: std::sync::Mutex::new(None),
		}
	}

	pub(crate) fn record_knn_scope(&self, _scope: &[Uuid]) {
		#[cfg(feature = "test-hooks")]
		{
			let mut guard = self.last_knn_scope.lock().unwrap_or_else(|err| err.into_inner());

			*guard = Some(_scope.to_vec());
		}
	}
}
