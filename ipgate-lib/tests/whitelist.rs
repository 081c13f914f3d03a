use ipgate_lib::{Address, AccessGate, RuleError, Whitelist};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_canonical_round_trip_is_stable() -> Result<(), RuleError> {
    for text in [
        "0.0.0.0",
        "192.168.1.255",
        "::",
        "::1",
        "2001:DB8::1",
        "fe80:0:0:0:0:0:0:1",
        "::ffff:192.0.2.1",
        "1:2:3:4:5:6:7:8",
    ] {
        let parsed = Address::parse(text)?;
        let canonical = parsed.to_canonical_string();
        assert_eq!(Address::parse(&canonical)?, parsed, "{text} -> {canonical}");
        assert_eq!(Address::parse(&canonical)?.to_canonical_string(), canonical);
    }
    Ok(())
}

#[test]
fn test_cidr_covers_whole_block() {
    let whitelist = Whitelist::new();
    assert!(whitelist.add_cidr("192.168.1.0/24").is_ok());

    for host in 0..=255u8 {
        let addr = format!("192.168.1.{host}");
        assert!(whitelist.is_allowed(&addr), "{addr} should be allowed");
    }
    assert!(!whitelist.is_allowed("192.168.2.1"));
    assert!(!whitelist.is_allowed("192.168.0.255"));
}

#[test]
fn test_cidr_functionality() {
    let whitelist = Whitelist::new();

    assert!(whitelist.add_cidr("192.168.1.0/24").is_ok());
    assert!(whitelist.add_cidr("10.0.0.0/8").is_ok());
    assert!(whitelist.add_cidr("2001:db8::/32").is_ok());

    assert!(matches!(whitelist.add_cidr("192.168.1.0"), Err(RuleError::MissingPrefix(_))));
    assert!(matches!(whitelist.add_cidr("192.168.1.0/"), Err(RuleError::InvalidPrefix(_))));
    assert!(matches!(
        whitelist.add_cidr("192.168.1.0/33"),
        Err(RuleError::PrefixOutOfRange { .. })
    ));
    assert_eq!(whitelist.len(), 3);

    assert!(whitelist.is_allowed("192.168.1.1"));
    assert!(whitelist.is_allowed("192.168.1.254"));
    assert!(whitelist.is_allowed("10.10.10.10"));
    assert!(whitelist.is_allowed("10.255.255.255"));
    assert!(whitelist.is_allowed("2001:db8:1234::5"));

    assert!(!whitelist.is_allowed("192.168.2.1"));
    assert!(!whitelist.is_allowed("11.0.0.1"));
    assert!(!whitelist.is_allowed("127.0.0.1"));
}

#[test]
fn test_cidr_host_bits_are_normalized() {
    let whitelist = Whitelist::new();
    assert!(whitelist.add_cidr("10.1.2.3/16").is_ok());
    assert!(whitelist.is_allowed("10.1.0.0"));
    assert!(whitelist.is_allowed("10.1.255.255"));
    assert!(!whitelist.is_allowed("10.2.0.0"));
    assert_eq!(whitelist.snapshot().cidrs()[0].to_string(), "10.1.0.0/16");
}

#[test]
fn test_range_functionality() {
    let whitelist = Whitelist::new();

    assert!(whitelist.add_range("10.0.0.10", "10.0.0.20").is_ok());
    assert!(whitelist.add_range("192.168.1.10", "192.168.1.20").is_ok());

    for host in 10..=20 {
        assert!(whitelist.is_allowed(&format!("10.0.0.{host}")));
    }
    assert!(!whitelist.is_allowed("10.0.0.9"));
    assert!(!whitelist.is_allowed("10.0.0.21"));
    assert!(!whitelist.is_allowed("192.168.1.9"));
    assert!(!whitelist.is_allowed("192.168.1.21"));
}

#[test]
fn test_cross_family_range_is_rejected() {
    let whitelist = Whitelist::new();
    assert!(matches!(
        whitelist.add_range("192.168.1.1", "::1"),
        Err(RuleError::FamilyMismatch { .. })
    ));
    assert!(whitelist.is_empty());
    assert!(!whitelist.is_allowed("192.168.1.1"));
    assert!(!whitelist.is_allowed("::1"));
}

#[test]
fn test_inverted_range_is_not_swapped() {
    let whitelist = Whitelist::new();
    assert!(matches!(
        whitelist.add_range("10.0.0.20", "10.0.0.10"),
        Err(RuleError::InvertedRange { .. })
    ));
    assert!(!whitelist.is_allowed("10.0.0.15"));
    assert!(whitelist.is_empty());
}

#[test]
fn test_v6_range() {
    let whitelist = Whitelist::new();
    assert!(whitelist.add_range("2001:db8::10", "2001:db8::20").is_ok());
    assert!(whitelist.is_allowed("2001:db8::1a"));
    assert!(!whitelist.is_allowed("2001:db8::21"));
    assert!(!whitelist.is_allowed("0.0.0.26"));
}

#[test]
fn test_pattern_functionality() {
    let whitelist = Whitelist::new();

    assert!(whitelist.add_pattern(r"192\.168\.1\.\d+").is_ok());
    assert!(whitelist.add_pattern(r"127\.0\.0\.[1-5]").is_ok());
    assert!(matches!(whitelist.add_pattern(r"192\.168\.(\d+"), Err(RuleError::InvalidPattern { .. })));

    assert!(whitelist.is_allowed("192.168.1.1"));
    assert!(whitelist.is_allowed("192.168.1.255"));
    assert!(whitelist.is_allowed("127.0.0.1"));
    assert!(whitelist.is_allowed("127.0.0.5"));

    assert!(!whitelist.is_allowed("192.168.2.1"));
    assert!(!whitelist.is_allowed("127.0.0.6"));
    assert!(!whitelist.is_allowed("10.0.0.1"));
}

#[test]
fn test_batch_operations() {
    let whitelist = Whitelist::new();

    let ips = ["127.0.0.1", "192.168.1.1", "invalid_ip", "10.0.0.1"];
    let cidrs = ["192.168.0.0/16", "invalid_cidr", "10.0.0.0/8"];

    assert_eq!(whitelist.add_many_exact(ips), 3);
    assert_eq!(whitelist.snapshot().exact_count(), 3);
    assert_eq!(whitelist.add_many_cidr(cidrs), 2);

    assert!(whitelist.is_allowed("127.0.0.1"));
    assert!(whitelist.is_allowed("192.168.1.1"));
    assert!(whitelist.is_allowed("10.0.0.1"));
    assert!(whitelist.is_allowed("192.168.100.100"));
    assert!(whitelist.is_allowed("10.255.255.255"));
    assert!(!whitelist.is_allowed("invalid_ip"));
}

#[test]
fn test_batch_exact_admits_exactly_the_valid_entries() {
    let whitelist = Whitelist::new();
    assert_eq!(whitelist.add_many_exact(["127.0.0.1", "192.168.1.1", "invalid_ip", "10.0.0.1"]), 3);
    assert_eq!(whitelist.len(), 3);
    assert!(!whitelist.is_allowed("127.0.0.2"));
}

#[test]
fn test_remove_functionality() {
    let whitelist = Whitelist::new();
    assert_eq!(whitelist.add_many_exact(["127.0.0.1", "192.168.1.1", "10.0.0.1"]), 3);
    assert_eq!(whitelist.size(), 3);

    assert_eq!(whitelist.remove_exact("127.0.0.1"), Ok(true));
    assert!(!whitelist.is_allowed("127.0.0.1"));
    assert_eq!(whitelist.size(), 2);

    assert_eq!(whitelist.remove_exact("127.0.0.1"), Ok(false));
    assert_eq!(whitelist.size(), 2);

    assert!(whitelist.remove_exact("invalid_ip").is_err());
    assert_eq!(whitelist.size(), 2);
}

#[test]
fn test_clear_removes_every_kind() {
    let whitelist = Whitelist::new();
    assert!(whitelist.add_exact("1.1.1.1").is_ok());
    assert!(whitelist.add_cidr("10.0.0.0/8").is_ok());
    assert!(whitelist.add_range("172.16.0.1", "172.16.0.9").is_ok());
    assert!(whitelist.add_pattern(r"8\.8\.8\.\d").is_ok());
    assert_eq!(whitelist.len(), 4);

    whitelist.clear();
    assert!(whitelist.is_empty());
    for addr in ["1.1.1.1", "10.1.1.1", "172.16.0.5", "8.8.8.8"] {
        assert!(!whitelist.is_allowed(addr));
    }
}

#[test]
fn test_add_exact_is_idempotent() {
    let whitelist = Whitelist::new();
    assert!(whitelist.add_exact("::1").is_ok());
    let size = whitelist.size();
    assert!(whitelist.add_exact("::1").is_ok());
    assert!(whitelist.add_exact("0:0:0:0:0:0:0:1").is_ok());
    assert_eq!(whitelist.size(), size);
}

#[test]
fn test_ipv6_exact() {
    let whitelist = Whitelist::new();
    assert!(whitelist.add_exact("::1").is_ok());
    assert!(whitelist.add_exact("2001:db8::1").is_ok());

    assert!(whitelist.is_allowed("::1"));
    assert!(whitelist.is_allowed("2001:db8::1"));
    assert!(!whitelist.is_allowed("2001:db8::2"));
    assert!(!whitelist.is_allowed("0.0.0.1"));
}

#[test]
fn test_set_whitelist_copy_and_move() {
    let gate = AccessGate::default();

    let new_whitelist = Whitelist::new();
    assert!(new_whitelist.add_exact("127.0.0.1").is_ok());
    assert!(new_whitelist.add_exact("192.168.1.100").is_ok());
    assert!(new_whitelist.add_cidr("10.0.0.0/8").is_ok());

    gate.set_whitelist_from(&new_whitelist);
    gate.enable(true);

    let whitelist = gate.whitelist();
    assert!(whitelist.is_allowed("127.0.0.1"));
    assert!(whitelist.is_allowed("192.168.1.100"));
    assert!(whitelist.is_allowed("10.1.2.3"));
    assert!(!whitelist.is_allowed("8.8.8.8"));

    let another_whitelist = Whitelist::new();
    assert!(another_whitelist.add_exact("172.16.0.1").is_ok());
    assert!(another_whitelist.add_pattern(r"192\.168\.1\.\d+").is_ok());

    gate.set_whitelist(another_whitelist);

    assert!(whitelist.is_allowed("172.16.0.1"));
    assert!(whitelist.is_allowed("192.168.1.50"));
    assert!(!whitelist.is_allowed("127.0.0.1"));
}

#[test]
fn test_disabled_gate_does_not_consult_whitelist() {
    let gate = AccessGate::default();
    assert!(gate.whitelist().add_exact("127.0.0.1").is_ok());
    gate.enable(false);
    assert!(gate.admit_str("203.0.113.9"));
    assert!(gate.admit_str("not-an-ip"));
    gate.enable(true);
    assert!(!gate.admit_str("203.0.113.9"));
    assert!(gate.admit_str("127.0.0.1"));
}

/// Readers must see either the old rules or the new rules, never a mix.
/// The two generations share no address, and each generation is detected
/// through two different rule kinds.
#[test]
fn test_replace_is_atomic_for_concurrent_readers() {
    fn generation(exact: &str, cidr: &str) -> Whitelist {
        let whitelist = Whitelist::new();
        assert!(whitelist.add_exact(exact).is_ok());
        assert!(whitelist.add_cidr(cidr).is_ok());
        whitelist
    }

    let live = Arc::new(generation("1.1.1.1", "10.0.0.0/8"));
    let old = generation("1.1.1.1", "10.0.0.0/8");
    let new = generation("2.2.2.2", "20.0.0.0/8");
    let old_addrs = [Address::V4(0x0101_0101), Address::V4(0x0A01_0101)];
    let new_addrs = [Address::V4(0x0202_0202), Address::V4(0x1401_0101)];

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let live = Arc::clone(&live);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut observed = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let snapshot = live.snapshot();
                    let old_hits = old_addrs.iter().filter(|a| snapshot.matches(a)).count();
                    let new_hits = new_addrs.iter().filter(|a| snapshot.matches(a)).count();
                    let consistent = (old_hits == 2 && new_hits == 0)
                        || (old_hits == 0 && new_hits == 2);
                    if !consistent {
                        return Err(format!("mixed snapshot: old={old_hits} new={new_hits}"));
                    }
                    observed += 1;
                }
                Ok(observed)
            })
        })
        .collect();

    for i in 0..2000 {
        if i % 2 == 0 {
            live.replace_from(&new);
        } else {
            live.replace(old.clone());
        }
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        match reader.join() {
            Ok(Ok(_)) => {}
            Ok(Err(msg)) => panic!("{msg}"),
            Err(_) => panic!("reader thread panicked"),
        }
    }
}

#[test]
fn test_concurrent_readers_and_writers() {
    let whitelist = Arc::new(Whitelist::new());
    assert!(whitelist.add_cidr("10.0.0.0/8").is_ok());

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let whitelist = Arc::clone(&whitelist);
            thread::spawn(move || {
                for j in 0..200 {
                    let _ = whitelist.add_exact(&format!("172.16.{i}.{j}"));
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let whitelist = Arc::clone(&whitelist);
            thread::spawn(move || (0..2000).all(|_| whitelist.is_allowed("10.1.2.3")))
        })
        .collect();

    for writer in writers {
        assert!(writer.join().is_ok());
    }
    for reader in readers {
        assert!(matches!(reader.join(), Ok(true)));
    }
    assert_eq!(whitelist.len(), 1 + 4 * 200);
}
