use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{Artwork, ArtworkSource, FetchResult, PageRequest};
use crate::state::{self, PageState, SelectionSet};

pub const BULK_PAGE_SIZE: u64 = 100;
pub const MAX_BULK_PAGES: u64 = 100;

#[derive(Clone, Debug)]
pub struct GridOptions {
    pub initial_state: PageState,
    pub bulk_page_size: u64,
    pub max_bulk_pages: u64,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            initial_state: PageState::default(),
            bulk_page_size: BULK_PAGE_SIZE,
            max_bulk_pages: MAX_BULK_PAGES,
        }
    }
}

// Busy while any guard is alive.
#[derive(Debug, Default)]
pub struct BusyCounter {
    active: AtomicUsize,
}

pub struct BusyGuard<'a> {
    counter: &'a BusyCounter,
}

impl BusyCounter {
    pub fn enter(&self) -> BusyGuard<'_> {
        self.active.fetch_add(1, Ordering::SeqCst);
        BusyGuard { counter: self }
    }

    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.counter.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub page_state: PageState,
    pub records: Vec<Artwork>,
    pub total_count: u64,
}

impl ViewState {
    pub fn visible_records(&self) -> Vec<Artwork> {
        let mut rows = self.records.clone();
        self.page_state.sort_records(&mut rows);
        rows
    }
}

#[derive(Clone, Debug)]
pub struct GridSnapshot {
    pub view: ViewState,
    pub selection: SelectionSet,
    pub page_loading: bool,
    pub bulk_loading: bool,
    pub select_input: String,
}

impl GridSnapshot {
    pub fn loading(&self) -> bool {
        self.page_loading || self.bulk_loading
    }

    pub fn footer(&self) -> String {
        format!("Total selected artworks: {}", self.selection.len())
    }
}

pub struct Grid<S> {
    source: Arc<S>,
    bulk_page_size: u64,
    max_bulk_pages: u64,
    view: Mutex<ViewState>,
    selection: Mutex<SelectionSet>,
    select_input: Mutex<String>,
    generation: AtomicU64,
    page_busy: BusyCounter,
    bulk_busy: BusyCounter,
}

impl<S: ArtworkSource> Grid<S> {
    pub fn new(source: S, options: GridOptions) -> Self {
        Self::with_shared_source(Arc::new(source), options)
    }

    pub fn with_shared_source(source: Arc<S>, options: GridOptions) -> Self {
        Self {
            source,
            bulk_page_size: options.bulk_page_size.max(1),
            max_bulk_pages: options.max_bulk_pages.max(1),
            view: Mutex::new(ViewState {
                page_state: options.initial_state,
                ..ViewState::default()
            }),
            selection: Mutex::new(SelectionSet::default()),
            select_input: Mutex::new(String::new()),
            generation: AtomicU64::new(0),
            page_busy: BusyCounter::default(),
            bulk_busy: BusyCounter::default(),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn bulk_page_size(&self) -> u64 {
        self.bulk_page_size
    }

    pub async fn page_state(&self) -> PageState {
        self.view.lock().await.page_state
    }

    pub fn page_loading(&self) -> bool {
        self.page_busy.is_busy()
    }

    pub fn bulk_loading(&self) -> bool {
        self.bulk_busy.is_busy()
    }

    pub async fn snapshot(&self) -> GridSnapshot {
        let view = self.view.lock().await.clone();
        let selection = self.selection.lock().await.clone();
        let select_input = self.select_input.lock().await.clone();
        GridSnapshot {
            view,
            selection,
            page_loading: self.page_loading(),
            bulk_loading: self.bulk_loading(),
            select_input,
        }
    }

    /// Runs one fetch cycle for `state`. A failed fetch empties the page but
    /// keeps the previous total; a response overtaken by a newer call is
    /// dropped.
    pub async fn on_page_state_change(&self, state: PageState) {
        let generation = {
            let mut view = self.view.lock().await;
            view.page_state = state;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        let _busy = self.page_busy.enter();

        let req = state.request();
        debug!(generation, page = req.page, limit = req.limit, "page fetch dispatched");
        let outcome = self.source.fetch_page(req).await;

        let mut view = self.view.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, page = req.page, "discarding stale page response");
            return;
        }
        match outcome {
            Ok(FetchResult {
                records,
                total_count,
            }) => {
                view.records = records;
                view.total_count = total_count;
            }
            Err(e) => {
                warn!(error = %e, page = req.page, "failed to fetch artworks");
                view.records.clear();
            }
        }
    }

    /// Replaces the selection with the first `count` records of the source,
    /// all or nothing.
    pub async fn select_first_n(&self, count: i64) {
        if count <= 0 {
            return;
        }
        let count = count as u64;
        let pages = count.div_ceil(self.bulk_page_size);
        if pages > self.max_bulk_pages {
            warn!(
                count,
                pages,
                max_pages = self.max_bulk_pages,
                "bulk selection exceeds page limit"
            );
            return;
        }
        let _busy = self.bulk_busy.enter();

        debug!(count, pages, "bulk selection dispatched");
        let requests = (1..=pages).map(|page| {
            self.source.fetch_page(PageRequest {
                page,
                limit: self.bulk_page_size,
            })
        });
        let results = join_all(requests).await;

        match results.into_iter().collect::<Result<Vec<_>, _>>() {
            Ok(fetched) => {
                let limit = usize::try_from(count).unwrap_or(usize::MAX);
                let records: Vec<Artwork> = fetched
                    .into_iter()
                    .flat_map(|page| page.records)
                    .take(limit)
                    .collect();
                info!(requested = count, selected = records.len(), "bulk selection applied");
                *self.selection.lock().await = SelectionSet::from_records(records);
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch pages for bulk selection");
            }
        }

        self.select_input.lock().await.clear();
    }

    pub async fn set_select_input(&self, text: &str) {
        *self.select_input.lock().await = text.to_string();
    }

    pub async fn submit_select_input(&self) {
        let raw = self.select_input.lock().await.clone();
        match state::parse_count(&raw) {
            Some(count) if count > 0 => self.select_first_n(count).await,
            _ => debug!(input = %raw, "ignoring bulk selection input"),
        }
    }

    pub async fn toggle_selection(&self, record: Artwork) -> bool {
        self.selection.lock().await.toggle(record)
    }

    pub async fn toggle_visible(&self, id: u64) -> Option<bool> {
        let record = {
            let view = self.view.lock().await;
            view.records.iter().find(|r| r.id == id).cloned()
        }?;
        Some(self.toggle_selection(record).await)
    }

    // selects every visible row unless all of them are selected already,
    // in which case they are all removed. Returns whether the page ends up selected.
    pub async fn toggle_page(&self) -> bool {
        let rows = self.view.lock().await.records.clone();
        let mut selection = self.selection.lock().await;
        if !rows.is_empty() && rows.iter().all(|r| selection.contains(r.id)) {
            for row in &rows {
                selection.remove(row.id);
            }
            debug!(rows = rows.len(), "page unselected");
            return false;
        }
        let added = rows.into_iter().filter(|r| selection.insert(r.clone())).count();
        debug!(added, "page selected");
        true
    }

    pub async fn set_selection(&self, records: Vec<Artwork>) {
        *self.selection.lock().await = SelectionSet::from_records(records);
    }

    pub async fn clear_selection(&self) {
        *self.selection.lock().await = SelectionSet::default();
    }

    pub async fn is_selected(&self, id: u64) -> bool {
        self.selection.lock().await.contains(id)
    }
}
