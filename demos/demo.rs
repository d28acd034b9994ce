use std::time::Instant;
use vmarena::{Arena, header};

fn main() {
    println!("vmarena demo");
    println!("============\n");

    // Explicit reservation, then bump allocation.
    let mut arena = Arena::new();
    arena.reserve(64 << 20).expect("reserve");
    println!(
        "reserved:    {} MiB at {:?}, page size {}",
        arena.reserved_size() >> 20,
        arena.base(),
        arena.page_size()
    );

    let a = arena.grow_commit(100).expect("grow");
    let b = arena.grow_commit(100).expect("grow");
    println!("two 100-byte allocations: {a:?}, {b:?}");
    println!(
        "  used = {}, committed = {} (one page serves both)",
        arena.used(),
        arena.committed()
    );

    arena.reset();
    let c = arena.grow_commit(100).expect("grow");
    println!("after reset: {c:?} (same address, no new commit)");

    // Fill a few MiB to show page-granular commits.
    let start = Instant::now();
    for _ in 0..100_000 {
        arena.grow_commit(32).expect("grow");
    }
    println!(
        "100k bump allocations in {:?}: used = {}, committed = {}",
        start.elapsed(),
        arena.used(),
        arena.committed()
    );

    arena.reset();
    arena.decommit(arena.committed()).expect("decommit");
    println!("decommitted: committed = {}", arena.committed());
    arena.release().expect("release");
    println!("released:    reserved = {}\n", arena.is_reserved());

    // Self-describing allocation: one pointer, grown in place.
    unsafe {
        let mut data = header::realloc(None, 256).expect("alloc").expect("non-null");
        data.as_ptr().write_bytes(0xAB, 256);
        for size in [4096, 1 << 20, 32 << 20] {
            let grown = header::realloc(Some(data), size).expect("grow").expect("non-null");
            assert_eq!(grown, data);
            data = grown;
            println!(
                "realloc to {:>9} bytes -> {:?}, capacity {}",
                size,
                data,
                header::capacity::<vmarena::OsBackend>(data)
            );
        }
        assert_eq!(*data.as_ptr().add(255), 0xAB);
        header::realloc(Some(data), 0).expect("free");
    }

    println!("\nDone.");
}
