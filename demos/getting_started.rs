use geo::point;
use geotag::{Config, MemoryStore, NearbyOptions, TagDraft, TagIndex, Visibility};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see range scan details)
    env_logger::init();

    println!("=== Geotag - Getting Started ===\n");

    // Create an engine over the bundled in-memory store
    let store = Arc::new(MemoryStore::new());
    let index = TagIndex::new(Arc::clone(&store));
    println!("✓ Created in-memory tag index\n");

    // === SAVING TAGS ===
    println!("1. Saving Tags");
    println!("--------------");

    // Points are (lon, lat): x = longitude, y = latitude
    let alexanderplatz = point!(x: 13.4132, y: 52.5219);
    let brandenburg = point!(x: 13.3777, y: 52.5163);
    let museum_island = point!(x: 13.3969, y: 52.5169);

    let id = index
        .save_tag(
            TagDraft::new("alice", alexanderplatz)
                .with_title("Alexanderplatz")
                .with_visibility(Visibility::Public),
        )
        .await?;
    println!("   Saved public tag {}", id);

    index
        .save_tag(
            TagDraft::new("bob", brandenburg)
                .with_title("Brandenburg Gate")
                .with_visibility(Visibility::Public)
                .with_payload(&br#"{"emoji":"camera"}"#[..]),
        )
        .await?;

    index
        .save_tag(
            TagDraft::new("alice", museum_island).with_title("My secret spot"),
        )
        .await?;
    println!("   Saved 3 tags, one of them private\n");

    // === NEARBY SEARCH ===
    println!("2. Nearby Search");
    println!("----------------");

    let center = point!(x: 13.3978, y: 52.5186);
    let nearby = index
        .find_nearby(&center, 2000.0, &NearbyOptions::default())
        .await?;
    println!("   Found {} public tags within 2km:", nearby.len());
    for tag in &nearby {
        println!("     - {}", tag.title.as_deref().unwrap_or("(untitled)"));
    }
    println!();

    // === QUERY OPTIONS ===
    println!("3. Query Options");
    println!("----------------");

    let with_private = index
        .find_nearby(&center, 2000.0, &NearbyOptions::default().include_private())
        .await?;
    println!("   Including private tags: {}", with_private.len());

    let not_mine = index
        .find_nearby(
            &center,
            2000.0,
            &NearbyOptions::default().exclude_owner("alice"),
        )
        .await?;
    println!("   Excluding alice's tags: {}\n", not_mine.len());

    // === MOVING A TAG ===
    println!("4. Moving a Tag");
    println!("---------------");

    let tempelhof = point!(x: 13.4017, y: 52.4732);
    index
        .update_tag(
            &id,
            TagDraft::new("alice", tempelhof)
                .with_title("Tempelhofer Feld")
                .with_visibility(Visibility::Public),
        )
        .await?;
    let still_there = index
        .find_nearby(&alexanderplatz, 500.0, &NearbyOptions::default())
        .await?;
    println!("   Tags left at the old location: {}", still_there.len());

    let moved = index
        .find_nearby(&tempelhof, 500.0, &NearbyOptions::default())
        .await?;
    println!("   Tags at the new location: {}\n", moved.len());

    // === FULL LISTING AND STATS ===
    println!("5. Full Listing and Stats");
    println!("-------------------------");

    let all = index.all_tags().await?;
    println!("   Tags in the store: {}", all.len());

    let stats = store.stats();
    println!("   Store operations so far: {}\n", stats.operations_count);

    // === CONFIGURATION ===
    println!("6. Configuration");
    println!("----------------");

    let config = Config::from_json(r#"{ "geohash_precision": 8 }"#)?
        .with_scan_timeout(Duration::from_secs(2));
    let tuned = TagIndex::with_config(Arc::new(MemoryStore::new()), config)?;
    println!(
        "   Engine with {}-char keys and a 2s scan budget: {:?}",
        tuned.config().geohash_precision,
        tuned.config().scan_timeout()
    );

    println!("\n=== Getting Started Complete! ===");
    println!("\nKey Features Demonstrated:");
    println!("  • Saving public and private tags");
    println!("  • Radius search with exact distance filtering");
    println!("  • Visibility and ownership query options");
    println!("  • Moving tags between index cells");
    println!("  • JSON-loadable configuration");

    Ok(())
}
