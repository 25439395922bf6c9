use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::api::{
    ApiResponse, Artwork, ArtworkSource, ClientOptions, FetchError, FetchResult, HttpSource,
    PageRequest,
};
use crate::grid::{Grid, GridOptions};
use crate::state::{PageState, SortDirection, SortField};

fn artwork(id: u64) -> Artwork {
    Artwork {
        id,
        title: format!("Artwork {id}"),
        place_of_origin: "Chicago".to_string(),
        artist_display: "Unknown".to_string(),
        inscriptions: None,
        date_start: 1900,
        date_end: 1901,
    }
}

fn malformed() -> FetchError {
    FetchError::MalformedResponse {
        url: "mock://artworks".to_string(),
        source: serde_json::from_str::<ApiResponse>("{").unwrap_err(),
    }
}

/// In-memory collection of artworks with ids 1..=total served in id order.
#[derive(Default)]
struct MockSource {
    records: Vec<Artwork>,
    failing_pages: HashSet<u64>,
    delays_ms: HashMap<u64, u64>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockSource {
    fn with_total(total: u64) -> Self {
        Self {
            records: (1..=total).map(artwork).collect(),
            ..Self::default()
        }
    }

    fn failing(mut self, page: u64) -> Self {
        self.failing_pages.insert(page);
        self
    }

    fn delayed(mut self, page: u64, ms: u64) -> Self {
        self.delays_ms.insert(page, ms);
        self
    }

    fn requests(&self) -> Vec<PageRequest> {
        let mut out = self.requests.lock().unwrap().clone();
        out.sort_by_key(|r| r.page);
        out
    }

    fn reset_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl ArtworkSource for MockSource {
    async fn fetch_page(&self, req: PageRequest) -> Result<FetchResult, FetchError> {
        self.requests.lock().unwrap().push(req);
        if let Some(ms) = self.delays_ms.get(&req.page) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing_pages.contains(&req.page) {
            return Err(malformed());
        }
        let start = ((req.page - 1) * req.limit) as usize;
        let end = (start + req.limit as usize).min(self.records.len());
        let records = if start < end {
            self.records[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(FetchResult {
            records,
            total_count: self.records.len() as u64,
        })
    }
}

fn grid(source: MockSource) -> Grid<MockSource> {
    Grid::new(source, GridOptions::default())
}

fn ids(records: &[Artwork]) -> Vec<u64> {
    records.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn page_change_issues_one_request_for_the_page_containing_offset() {
    let grid = grid(MockSource::with_total(500));
    let cases = [(0, 12, 1), (11, 12, 1), (12, 12, 2), (60, 25, 3), (199, 100, 2)];
    for (offset, size, page) in cases {
        grid.source().reset_requests();
        grid.on_page_state_change(PageState::new(offset, size).unwrap())
            .await;
        assert_eq!(
            grid.source().requests(),
            vec![PageRequest { page, limit: size }],
            "offset {offset} size {size}"
        );
    }
}

#[tokio::test]
async fn page_change_replaces_rows_and_total() {
    let grid = grid(MockSource::with_total(30));
    grid.on_page_state_change(PageState::for_page(2, 12).unwrap())
        .await;
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(&snapshot.view.records), (13..=24).collect::<Vec<_>>());
    assert_eq!(snapshot.view.total_count, 30);
    assert_eq!(snapshot.view.page_state.page_number(), 2);
    assert!(!snapshot.loading());

    grid.on_page_state_change(PageState::for_page(3, 12).unwrap())
        .await;
    assert_eq!(ids(&grid.snapshot().await.view.records), (25..=30).collect::<Vec<_>>());
}

#[tokio::test]
async fn failed_page_fetch_empties_rows_and_keeps_total() {
    let grid = grid(MockSource::with_total(50).failing(2));
    grid.on_page_state_change(PageState::for_page(1, 12).unwrap())
        .await;
    assert_eq!(grid.snapshot().await.view.total_count, 50);

    grid.on_page_state_change(PageState::for_page(2, 12).unwrap())
        .await;
    let snapshot = grid.snapshot().await;
    assert!(snapshot.view.records.is_empty());
    assert_eq!(snapshot.view.total_count, 50);
    assert!(!snapshot.page_loading);
}

#[tokio::test]
async fn page_loading_is_set_while_fetch_in_flight() {
    let grid = grid(MockSource::with_total(50).delayed(1, 80));
    let (_, during) = tokio::join!(grid.on_page_state_change(PageState::default()), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        (grid.page_loading(), grid.bulk_loading())
    });
    assert_eq!(during, (true, false));
    assert!(!grid.page_loading());
}

#[tokio::test]
async fn stale_page_response_is_discarded() {
    let grid = grid(MockSource::with_total(50).delayed(1, 80));
    let (_, _, mid) = tokio::join!(
        grid.on_page_state_change(PageState::for_page(1, 12).unwrap()),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            grid.on_page_state_change(PageState::for_page(2, 12).unwrap())
                .await;
        },
        async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            grid.page_loading()
        }
    );
    // the slow page 1 fetch was still running after page 2 landed
    assert!(mid);
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(&snapshot.view.records), (13..=24).collect::<Vec<_>>());
    assert_eq!(snapshot.view.page_state.page_number(), 2);
    assert!(!snapshot.page_loading);
}

#[tokio::test]
async fn sort_is_kept_in_state_and_applied_to_visible_rows() {
    let grid = grid(MockSource::with_total(12));
    let state = PageState::default().with_sort(SortField::Title, SortDirection::Descending);
    grid.on_page_state_change(state).await;
    assert_eq!(
        grid.source().requests(),
        vec![PageRequest { page: 1, limit: 12 }]
    );
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(&snapshot.view.records), (1..=12).collect::<Vec<_>>());
    // "Artwork 9" > "Artwork 8" > ... > "Artwork 12" > "Artwork 11" > "Artwork 10" > "Artwork 1"
    let visible = ids(&snapshot.view.visible_records());
    assert_eq!(visible.first(), Some(&9));
    assert_eq!(visible.last(), Some(&1));
}

#[tokio::test]
async fn select_first_250_fetches_three_pages_of_100() {
    let grid = grid(MockSource::with_total(1000));
    grid.select_first_n(250).await;
    assert_eq!(
        grid.source().requests(),
        vec![
            PageRequest { page: 1, limit: 100 },
            PageRequest { page: 2, limit: 100 },
            PageRequest { page: 3, limit: 100 },
        ]
    );
    let snapshot = grid.snapshot().await;
    assert_eq!(snapshot.selection.len(), 250);
    assert_eq!(ids(snapshot.selection.records()), (1..=250).collect::<Vec<_>>());
    assert_eq!(snapshot.footer(), "Total selected artworks: 250");
    assert!(!snapshot.bulk_loading);
}

#[tokio::test]
async fn bulk_request_count_is_ceil_of_count_over_page_size() {
    for (count, expected) in [(1, 1), (99, 1), (100, 1), (101, 2), (250, 3), (1000, 10)] {
        let grid = grid(MockSource::with_total(2000));
        grid.select_first_n(count).await;
        assert_eq!(grid.source().requests().len(), expected, "count {count}");
        assert_eq!(grid.snapshot().await.selection.len(), count as usize);
    }
}

#[tokio::test]
async fn bulk_selection_keeps_page_order_despite_arrival_order() {
    let source = MockSource::with_total(400)
        .delayed(1, 90)
        .delayed(2, 45);
    let grid = grid(source);
    grid.select_first_n(260).await;
    let selection = grid.snapshot().await.selection;
    assert_eq!(ids(selection.records()), (1..=260).collect::<Vec<_>>());
}

#[tokio::test]
async fn bulk_selection_stops_at_end_of_collection() {
    let grid = grid(MockSource::with_total(80));
    grid.select_first_n(200).await;
    assert_eq!(grid.source().requests().len(), 2);
    assert_eq!(grid.snapshot().await.selection.len(), 80);
}

#[tokio::test]
async fn bulk_selection_is_idempotent() {
    let grid = grid(MockSource::with_total(300));
    grid.select_first_n(150).await;
    let first = grid.snapshot().await.selection;
    grid.select_first_n(150).await;
    let second = grid.snapshot().await.selection;
    assert_eq!(first, second);
}

#[tokio::test]
async fn bulk_selection_replaces_previous_selection() {
    let grid = grid(MockSource::with_total(300));
    grid.set_selection(vec![artwork(299), artwork(300)]).await;
    grid.select_first_n(5).await;
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(snapshot.selection.records()), vec![1, 2, 3, 4, 5]);
    assert!(!grid.is_selected(300).await);
}

#[tokio::test]
async fn non_positive_or_non_numeric_input_is_a_no_op() {
    let grid = grid(MockSource::with_total(300));
    grid.set_selection(vec![artwork(7)]).await;

    grid.select_first_n(0).await;
    grid.select_first_n(-5).await;
    for input in ["-5", "0", "abc", ""] {
        grid.set_select_input(input).await;
        grid.submit_select_input().await;
        assert_eq!(grid.snapshot().await.select_input, input);
    }

    assert!(grid.source().requests().is_empty());
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(snapshot.selection.records()), vec![7]);
    assert!(!snapshot.bulk_loading);
}

#[tokio::test]
async fn submitted_input_is_cleared_after_selection() {
    let grid = grid(MockSource::with_total(300));
    grid.set_select_input("12 rows").await;
    grid.submit_select_input().await;
    let snapshot = grid.snapshot().await;
    assert_eq!(snapshot.selection.len(), 12);
    assert_eq!(snapshot.select_input, "");
}

#[tokio::test]
async fn failed_bulk_selection_keeps_selection_and_clears_input() {
    let grid = grid(MockSource::with_total(500).failing(2));
    grid.set_selection(vec![artwork(42)]).await;
    grid.set_select_input("250").await;
    grid.submit_select_input().await;

    assert_eq!(grid.source().requests().len(), 3);
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(snapshot.selection.records()), vec![42]);
    assert_eq!(snapshot.select_input, "");
    assert!(!snapshot.bulk_loading);
}

#[tokio::test]
async fn bulk_and_page_loading_are_independent() {
    let source = MockSource::with_total(500).delayed(1, 60);
    let grid = grid(source);
    let (_, during) = tokio::join!(grid.select_first_n(150), async {
        tokio::time::sleep(Duration::from_millis(15)).await;
        grid.on_page_state_change(PageState::for_page(2, 12).unwrap())
            .await;
        (grid.page_loading(), grid.bulk_loading())
    });
    assert_eq!(during, (false, true));
    assert!(!grid.bulk_loading());
    assert_eq!(grid.snapshot().await.selection.len(), 150);
}

#[tokio::test]
async fn selection_survives_pagination() {
    let grid = grid(MockSource::with_total(100));
    grid.on_page_state_change(PageState::default()).await;
    assert_eq!(grid.toggle_visible(3).await, Some(true));
    assert_eq!(grid.toggle_visible(50).await, None);

    grid.on_page_state_change(PageState::for_page(5, 12).unwrap())
        .await;
    assert!(grid.is_selected(3).await);
    assert_eq!(grid.toggle_visible(50).await, Some(true));

    let snapshot = grid.snapshot().await;
    assert_eq!(ids(snapshot.selection.records()), vec![3, 50]);

    assert!(!grid.toggle_selection(artwork(3)).await);
    grid.clear_selection().await;
    assert!(grid.snapshot().await.selection.is_empty());
}

#[tokio::test]
async fn custom_bulk_page_size_is_used() {
    let grid = Grid::new(
        MockSource::with_total(100),
        GridOptions {
            bulk_page_size: 25,
            ..GridOptions::default()
        },
    );
    grid.select_first_n(60).await;
    assert_eq!(
        grid.source().requests(),
        vec![
            PageRequest { page: 1, limit: 25 },
            PageRequest { page: 2, limit: 25 },
            PageRequest { page: 3, limit: 25 },
        ]
    );
    assert_eq!(grid.snapshot().await.selection.len(), 60);
}

#[tokio::test]
async fn page_wide_toggle_survives_pagination() {
    let grid = grid(MockSource::with_total(100));
    grid.on_page_state_change(PageState::default()).await;
    assert_eq!(grid.toggle_visible(4).await, Some(true));

    assert!(grid.toggle_page().await);
    let page_one: Vec<u64> = (1..=12).collect();
    let mut selected = ids(grid.snapshot().await.selection.records());
    selected.sort_unstable();
    assert_eq!(selected, page_one);

    grid.on_page_state_change(PageState::for_page(2, 12).unwrap())
        .await;
    assert_eq!(grid.toggle_visible(13).await, Some(true));
    for id in &page_one {
        assert!(grid.is_selected(*id).await, "id {id}");
    }

    grid.on_page_state_change(PageState::default()).await;
    assert!(!grid.toggle_page().await);
    assert_eq!(ids(grid.snapshot().await.selection.records()), vec![13]);
}

#[tokio::test]
async fn bulk_selection_over_page_limit_fetches_nothing() {
    let grid = Grid::new(
        MockSource::with_total(100),
        GridOptions {
            bulk_page_size: 10,
            max_bulk_pages: 3,
            ..GridOptions::default()
        },
    );
    grid.set_selection(vec![artwork(7)]).await;
    grid.set_select_input("31").await;
    grid.submit_select_input().await;
    grid.select_first_n(i64::MAX).await;

    assert!(grid.source().requests().is_empty());
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(snapshot.selection.records()), vec![7]);
    assert_eq!(snapshot.select_input, "31");
    assert!(!snapshot.bulk_loading);

    grid.select_first_n(30).await;
    assert_eq!(grid.source().requests().len(), 3);
    assert_eq!(grid.snapshot().await.selection.len(), 30);
}

#[tokio::test]
async fn bulk_selection_collapses_repeated_ids() {
    let grid = grid(MockSource {
        records: [1, 2, 2, 3, 1, 4].into_iter().map(artwork).collect(),
        ..MockSource::default()
    });
    grid.select_first_n(6).await;
    let snapshot = grid.snapshot().await;
    assert_eq!(ids(snapshot.selection.records()), vec![1, 2, 3, 4]);
    assert_eq!(snapshot.footer(), "Total selected artworks: 4");
}

async fn serve_once(
    status_line: &'static str,
    body: String,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let resp = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(resp.as_bytes()).await.unwrap();
        let _ = sock.shutdown().await;
        String::from_utf8_lossy(&buf)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    });
    (format!("http://{addr}/api/v1"), handle)
}

fn local_source(base_url: String) -> HttpSource {
    HttpSource::new(&ClientOptions {
        base_url,
        timeout_seconds: 5,
        use_system_proxy: false,
        ..ClientOptions::default()
    })
    .unwrap()
}

#[tokio::test]
async fn http_source_requests_projection_and_decodes_page() {
    let body = r#"{"pagination":{"total":129884,"limit":2,"offset":2,"total_pages":64942,"current_page":2},
        "data":[{"id":27992,"title":"A Sunday on La Grande Jatte","place_of_origin":"France",
        "artist_display":"Georges Seurat","inscriptions":null,"date_start":1884,"date_end":1886},
        {"id":28560,"title":"The Bedroom","place_of_origin":"France",
        "artist_display":"Vincent van Gogh","inscriptions":"signed","date_start":1889,"date_end":1889}]}"#;
    let (base, server) = serve_once("HTTP/1.1 200 OK", body.to_string()).await;
    let source = local_source(base);

    let page = source
        .fetch_page(PageRequest { page: 2, limit: 2 })
        .await
        .unwrap();
    assert_eq!(page.total_count, 129884);
    assert_eq!(ids(&page.records), vec![27992, 28560]);
    assert_eq!(page.records[1].inscriptions.as_deref(), Some("signed"));

    let request_line = server.await.unwrap();
    assert!(request_line.starts_with("GET /api/v1/artworks?page=2&limit=2&fields="));
    assert!(request_line.contains("date_end"));
}

#[tokio::test]
async fn http_source_missing_data_is_empty_page() {
    let (base, server) =
        serve_once("HTTP/1.1 200 OK", r#"{"pagination":{"total":5}}"#.to_string()).await;
    let page = local_source(base)
        .fetch_page(PageRequest { page: 9, limit: 12 })
        .await
        .unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.total_count, 5);
    server.await.unwrap();
}

#[tokio::test]
async fn http_source_classifies_failures() {
    let (base, server) = serve_once("HTTP/1.1 200 OK", r#"{"data":[]}"#.to_string()).await;
    let err = local_source(base)
        .fetch_page(PageRequest { page: 1, limit: 12 })
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse { .. }));
    server.await.unwrap();

    let (base, server) =
        serve_once("HTTP/1.1 500 Internal Server Error", "{}".to_string()).await;
    let err = local_source(base)
        .fetch_page(PageRequest { page: 1, limit: 12 })
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn grid_over_http_degrades_to_empty_page_on_error() {
    let body = r#"{"pagination":{"total":3},"data":[{"id":1,"title":"a"},{"id":2,"title":"b"}]}"#;
    let (base, server) = serve_once("HTTP/1.1 200 OK", body.to_string()).await;
    let grid = Grid::new(local_source(base), GridOptions::default());
    grid.on_page_state_change(PageState::default()).await;
    server.await.unwrap();
    assert_eq!(grid.snapshot().await.view.records.len(), 2);

    let (base, server) = serve_once("HTTP/1.1 503 Service Unavailable", String::new()).await;
    let failing = Grid::new(local_source(base), GridOptions::default());
    failing.on_page_state_change(PageState::default()).await;
    server.await.unwrap();
    let snapshot = failing.snapshot().await;
    assert!(snapshot.view.records.is_empty());
    assert_eq!(snapshot.view.total_count, 0);
    assert!(!snapshot.loading());
}
