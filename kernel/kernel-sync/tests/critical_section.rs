use kernel_sync::CriticalSection;
use std::sync::Arc;
use std::thread;

#[test]
fn basic_enter_and_raii() {
    let s = CriticalSection::new(0_u32);

    // enter, mutate, and drop
    {
        let mut g = s.enter();
        *g = 41;
    }

    // enter again; the previous drop must have left the section
    {
        let mut g = s.enter();
        *g += 1;
        assert_eq!(*g, 42);
    }
}

#[test]
fn try_enter_semantics() {
    let s = CriticalSection::new(1_u8);

    let g1 = s.try_enter();
    assert!(g1.is_some());
    assert_eq!(**g1.as_ref().unwrap(), 1);

    // while occupied, try_enter must fail
    assert!(s.try_enter().is_none());

    drop(g1);
    assert!(s.try_enter().is_some());
}

#[test]
fn with_runs_and_releases() {
    let s = CriticalSection::new(String::from("a"));
    let len = s.with(|v| {
        v.push('b');
        v.len()
    });
    assert_eq!(len, 2);

    // section must be free now
    let got = s.with(|v| v.clone());
    assert_eq!(got, "ab");
}

#[test]
fn get_mut_allows_direct_mutation() {
    let mut s = CriticalSection::new(vec![1, 2, 3]);
    s.get_mut().push(4);
    assert_eq!(s.enter().as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn exclusion_under_contention() {
    let s = Arc::new(CriticalSection::new(0_u64));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let s = Arc::clone(&s);
        handles.push(thread::spawn(move || {
            for _ in 0..10_000 {
                s.with(|v| *v += 1);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(s.with(|v| *v), 40_000);
}
