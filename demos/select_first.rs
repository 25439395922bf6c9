use artgrid::api::{ClientOptions, HttpSource};
use artgrid::grid::{Grid, GridOptions};
use artgrid::state::PageState;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let source = HttpSource::new(&ClientOptions {
        timeout_seconds: 5,
        ..ClientOptions::default()
    })?;
    let grid = Grid::new(source, GridOptions::default());

    grid.on_page_state_change(PageState::for_page(2, 25)?).await;
    grid.select_first_n(150).await;

    let snapshot = grid.snapshot().await;
    println!("Total: {}", snapshot.view.total_count);
    for r in snapshot.view.records.iter() {
        let marker = if snapshot.selection.contains(r.id) { "x" } else { " " };
        println!("[{}] {} {}", marker, r.id, r.title);
    }
    println!("{}", snapshot.footer());

    Ok(())
}
