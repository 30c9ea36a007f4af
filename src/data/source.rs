//! Remote collection client.
//!
//! The archive API serves one collection per `action`, paginated by `page`
//! and `per_page`. An empty JSON array marks the end of a collection.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use url::Url;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestInit, RequestMode, Response};

use super::error::SourceError;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 15_000;

/// Anything that can serve pages of raw collection records.
#[async_trait(?Send)]
pub trait CollectionSource {
	/// Fetches one page. Pages are numbered from 1; an empty vector means the
	/// collection has no more records.
	async fn fetch_page(
		&self,
		collection: &str,
		page: usize,
		page_size: usize,
	) -> Result<Vec<Value>, SourceError>;

	/// Abandons every request still in flight; they fail with
	/// [`SourceError::Aborted`].
	fn abort_pending(&self) {}
}

#[async_trait(?Send)]
impl<S: CollectionSource + ?Sized> CollectionSource for Rc<S> {
	async fn fetch_page(
		&self,
		collection: &str,
		page: usize,
		page_size: usize,
	) -> Result<Vec<Value>, SourceError> {
		(**self).fetch_page(collection, page, page_size).await
	}

	fn abort_pending(&self) {
		(**self).abort_pending()
	}
}

/// Browser `fetch` based client for the archive API.
#[derive(Debug)]
pub struct HttpSource {
	base_url: String,
	timeout_ms: u32,
	next_request: Cell<u64>,
	in_flight: RefCell<HashMap<u64, AbortController>>,
}

impl HttpSource {
	/// A client for the API at `base_url`, which must be absolute.
	pub fn new(base_url: &str) -> Self {
		Self {
			base_url: base_url.to_string(),
			timeout_ms: DEFAULT_TIMEOUT_MS,
			next_request: Cell::new(0),
			in_flight: RefCell::new(HashMap::new()),
		}
	}

	/// Per-request timeout in milliseconds.
	pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	/// Builds the page URL from the base URL and query parameters.
	pub fn page_url(&self, collection: &str, page: usize, page_size: usize) -> Result<Url, SourceError> {
		let page = page.to_string();
		let page_size = page_size.to_string();
		Url::parse_with_params(
			&self.base_url,
			&[
				("action", collection),
				("page", page.as_str()),
				("per_page", page_size.as_str()),
			],
		)
		.map_err(|e| SourceError::Request(format!("invalid base url `{}`: {e}", self.base_url)))
	}

	async fn get_text(&self, url: &Url) -> Result<String, SourceError> {
		let window = web_sys::window().ok_or_else(|| SourceError::Request("no window".into()))?;
		let controller = AbortController::new().map_err(js_error)?;

		let opts = RequestInit::new();
		opts.set_method("GET");
		opts.set_mode(RequestMode::Cors);
		opts.set_signal(Some(&controller.signal()));
		let request = Request::new_with_str_and_init(url.as_str(), &opts).map_err(js_error)?;

		let id = self.next_request.get();
		self.next_request.set(id + 1);
		self.in_flight.borrow_mut().insert(id, controller.clone());

		// Abort the request once the timeout elapses.
		let timed_out = Rc::new(Cell::new(false));
		let abort = {
			let timed_out = timed_out.clone();
			let controller = controller.clone();
			Closure::once(move || {
				timed_out.set(true);
				controller.abort();
			})
		};
		let timer = match window.set_timeout_with_callback_and_timeout_and_arguments_0(
			abort.as_ref().unchecked_ref(),
			self.timeout_ms as i32,
		) {
			Ok(timer) => timer,
			Err(e) => {
				self.in_flight.borrow_mut().remove(&id);
				return Err(js_error(e));
			}
		};

		let outcome = async {
			let value = JsFuture::from(window.fetch_with_request(&request))
				.await
				.map_err(js_error)?;
			let response: Response = value
				.dyn_into()
				.map_err(|_| SourceError::Body("response is not a Response".into()))?;
			if !response.ok() {
				return Err(SourceError::Status(response.status()));
			}
			let text = JsFuture::from(response.text().map_err(js_error)?)
				.await
				.map_err(js_error)?;
			text.as_string()
				.ok_or_else(|| SourceError::Body("body is not text".into()))
		}
		.await;

		window.clear_timeout_with_handle(timer);
		drop(abort);
		self.in_flight.borrow_mut().remove(&id);

		match outcome {
			Err(_) if timed_out.get() => Err(SourceError::Timeout(self.timeout_ms)),
			Err(_) if controller.signal().aborted() => Err(SourceError::Aborted),
			other => other,
		}
	}
}

#[async_trait(?Send)]
impl CollectionSource for HttpSource {
	async fn fetch_page(
		&self,
		collection: &str,
		page: usize,
		page_size: usize,
	) -> Result<Vec<Value>, SourceError> {
		let url = self.page_url(collection, page, page_size)?;
		let text = self.get_text(&url).await?;
		parse_page(&text)
	}

	fn abort_pending(&self) {
		let pending: Vec<AbortController> = self.in_flight.borrow_mut().drain().map(|(_, c)| c).collect();
		if !pending.is_empty() {
			debug!("scholar-graph: aborting {} pending requests", pending.len());
		}
		for controller in pending {
			controller.abort();
		}
	}
}

/// Parses a page body. The API answers with a bare JSON array of records.
pub fn parse_page(text: &str) -> Result<Vec<Value>, SourceError> {
	match serde_json::from_str::<Value>(text) {
		Ok(Value::Array(records)) => Ok(records),
		Ok(other) => Err(SourceError::Body(format!(
			"expected a JSON array, got {}",
			json_kind(&other)
		))),
		Err(e) => Err(SourceError::Body(e.to_string())),
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

fn js_error(value: JsValue) -> SourceError {
	SourceError::Request(format!("{value:?}"))
}
