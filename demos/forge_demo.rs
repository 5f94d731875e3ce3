//! Signs several messages with one Lamport key, then forges a signature on a new message
//! from the leaked preimages alone.
//!
//! usage: forge_demo [<nb-signatures> [<name>]]
//!
//! Four signatures leave about 32 forced bits, i.e. billions of hashes; eight leave about 2.
use lamport_ots::forge::{forge, ForgeConfig};
use lamport_ots::knowledge::derive_knowledge_checked;
use lamport_ots::lamport::{generate, sign, verify};
use lamport_ots::{hash_message, Message};
use rand::rngs::OsRng;
use std::env::args;
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn usage(arg0: &str) {
    println!("usage: {} [<nb-signatures> [<name>]]", arg0);
    exit(1);
}

fn msg_hex(m: &Message) -> String {
    hex::encode(m.as_bytes())
}

pub fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = args().collect::<Vec<_>>();
    let nb_signatures = match args.get(1).map(|s| s.parse::<usize>()) {
        None => 8,
        Some(Ok(n)) if n > 0 => n,
        Some(_) => {
            usage(&args[0]);
            return;
        }
    };
    let name = args.get(2).cloned().unwrap_or_else(|| "demo".to_string());

    let (sk, pk) = match generate(&mut OsRng) {
        Ok(keys) => keys,
        Err(e) => {
            eprintln!("cannot generate key: {}", e);
            exit(1);
        }
    };

    let pairs: Vec<_> = (1..=nb_signatures)
        .map(|n| {
            let m = hash_message(n.to_string().as_bytes());
            (m, sign(&m, &sk))
        })
        .collect();
    drop(sk);

    for (i, (m, sig)) in pairs.iter().enumerate() {
        println!("ok {} : {} {}", i + 1, verify(m, &pk, sig), msg_hex(m));
    }

    let knowledge = derive_knowledge_checked(&pairs, &pk).unwrap_or_else(|e| {
        eprintln!("invalid observations: {}", e);
        exit(1)
    });
    let constraint = knowledge.constraint();
    println!("free positions   : {}", knowledge.free_positions());
    println!("forced positions : {}", constraint.forced_count());
    println!("forced mask      : {}", hex::encode(constraint.mask()));
    println!("forced values    : {}", hex::encode(constraint.value()));

    let config = ForgeConfig::default().with_prefix(format!("forge {}", name));
    match forge(&knowledge, &pk, &config) {
        Ok(forgery) => {
            println!(
                "found message    : {}",
                String::from_utf8_lossy(forgery.plaintext())
            );
            println!("message hash     : {}", msg_hex(forgery.message()));
            println!("attempts         : {}", forgery.attempts());
            println!(
                "verifies         : {}",
                verify(forgery.message(), &pk, forgery.signature())
            );
            println!("signature        : {}", hex::encode(forgery.signature().to_bytes()));
        }
        Err(e) => {
            eprintln!("forgery failed: {}", e);
            exit(1);
        }
    }
}
