//! Performance benchmarks for level and weapon hot paths

use server::level::{Level, LevelItemType, PlayerId};
use server::script::{format_client_script, NoCompiler};
use server::weapon::Weapon;
use shared::ClientVersion;
use std::sync::Arc;
use std::time::Instant;

fn full_nw_level() -> String {
    let mut text = String::from("GLEVNW01\n");
    for y in 0..64 {
        text.push_str(&format!("BOARD 0 {} 64 0 {}\n", y, "AbCd".repeat(32)));
    }
    for i in 0..20 {
        text.push_str(&format!("LINK level{}.nw {} 0 1 1 30 30\n", i, i));
        text.push_str(&format!("SIGN {} 10\nSign number {}\nSIGNEND\n", i, i));
    }
    text
}

/// Benchmarks board patches as clients send them
#[test]
fn benchmark_alter_board() {
    let mut level = Level::new("bench.nw");
    let patch = [0x123u16; 16];

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let x = (i % 60) as i32;
        let y = ((i / 60) % 60) as i32;
        assert!(level.alter_board(&patch, x, y, 4, 4, Some(PlayerId(1))));
    }

    let duration = start.elapsed();
    println!(
        "Board patches: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(level.changes().len(), iterations);
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks encoding the full board snapshot
#[test]
fn benchmark_board_packets() {
    let level = Level::parse("bench.nw", full_nw_level().as_bytes()).unwrap();

    let iterations = 1_000;
    let start = Instant::now();

    let mut total = 0;
    for _ in 0..iterations {
        total += level.board_packets().iter().map(Vec::len).sum::<usize>();
    }

    let duration = start.elapsed();
    println!(
        "Board snapshot: {} iterations, {} bytes in {:?}",
        iterations, total, duration
    );

    assert!(total > 0);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks baddy encoding with a full level of baddies
#[test]
fn benchmark_baddy_packets() {
    let mut level = Level::new("bench.nw");
    for i in 0..50 {
        assert!(level.add_baddy(i as f32, i as f32, (i % 10) as u8).is_some());
    }
    assert!(level.add_baddy(0.0, 0.0, 0).is_none());

    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let version = if i % 2 == 0 {
            ClientVersion::V1_41
        } else {
            ClientVersion::V6_037
        };
        let packets = level.baddy_packets(version).unwrap();
        assert_eq!(packets.len(), 50);
    }

    let duration = start.elapsed();
    println!(
        "Baddy packets: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks parsing a complete NW level
#[test]
fn benchmark_nw_parsing() {
    let text = full_nw_level();

    let iterations = 200;
    let start = Instant::now();

    for _ in 0..iterations {
        let level = Level::parse("bench.nw", text.as_bytes()).unwrap();
        assert_eq!(level.links().len(), 20);
    }

    let duration = start.elapsed();
    println!(
        "NW parsing: {} levels in {:?} ({:.2} ms/level)",
        iterations,
        duration,
        duration.as_millis() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 3000);
}

/// Stress tests item placement and expiry on one level
#[test]
fn stress_test_item_churn() {
    let mut level = Level::new("bench.nw");

    let iterations = 5_000;
    let start = Instant::now();

    for i in 0..iterations {
        let x = (i % 64) as f32;
        let y = (i / 64) as f32;
        level.drop_item(x, y, LevelItemType::GreenRupee, i as u64);
        if i % 100 == 0 {
            level.do_timed_events(i as u64);
        }
    }
    level.do_timed_events(iterations as u64);

    let duration = start.elapsed();
    println!("Item churn: {} drops in {:?}", iterations, duration);

    assert!(level.items().is_empty());
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks inline script formatting and weapon packet encoding
#[test]
fn benchmark_weapon_packets() {
    let mut source = String::from("//#CLIENTSIDE\n");
    for i in 0..200 {
        source.push_str(&format!("if (created) {{ x = {}; }} // line {}\n", i, i));
    }
    let weapon = Weapon::new("Bench", "bench.png", &source, 1, Arc::new(NoCompiler));

    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let packet = weapon.packet_for(ClientVersion::V2_17, i).unwrap();
        assert!(packet.ends_with(b"\n"));
    }
    let formatted = format_client_script(&source);

    let duration = start.elapsed();
    println!(
        "Weapon packets: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(!formatted.is_empty());
    assert!(duration.as_millis() < 1000);
}
