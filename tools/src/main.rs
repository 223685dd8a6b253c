//! funnel-runner: headless seeded traffic generator for the quiz funnel.
//!
//! Drives the core crate end to end — sessions, answers, completions —
//! and prints the reconciled metrics at the end. Deterministic for a
//! given seed.
//!
//! Usage:
//!   funnel-runner --seed 42 --sessions 200 --db funnel.db
//!   funnel-runner --db funnel.db --clear

use anyhow::Result;
use funnel_core::aggregator::Aggregator;
use funnel_core::config::{ScoringConfig, VariantCatalog};
use funnel_core::lead::Contact;
use funnel_core::questions::QUESTIONS;
use funnel_core::store::LocalStore;
use funnel_core::tracker::Tracker;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::env;

const VARIANTS: &[&str] = &[
    "testbx4", "testbx5", "testbx6", "testbx7", "testbx8", "testbx9", "default",
];

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let sessions = parse_arg(&args, "--sessions", 50u64);
    let clear = args.iter().any(|a| a == "--clear");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");

    // For :memory: use a SQLite shared-memory URI so the trackers and the
    // aggregator all see the same database.
    let db_effective: String = if db == ":memory:" {
        format!("file:funnelrun_{}?mode=memory&cache=shared", unix_secs())
    } else {
        db.to_string()
    };

    let store = LocalStore::open(&db_effective)?;
    store.migrate()?;

    if clear {
        store.clear_all()?;
        println!("Todos os dados foram limpos de {db}");
        return Ok(());
    }

    println!("funnel-runner");
    println!("  seed:     {seed}");
    println!("  sessions: {sessions}");
    println!("  db:       {db}");
    println!();

    let mut rng = Pcg64::seed_from_u64(seed);

    for n in 0..sessions {
        let variante = *VARIANTS.choose(&mut rng).unwrap_or(&"default");
        let session_id = format!("sim-{seed}-{n}");
        let mut tracker = Tracker::new(
            store.reopen()?,
            ScoringConfig::default(),
            session_id,
            variante.to_string(),
        );

        tracker.start_session(
            &format!("https://quiz.local/?variante={variante}"),
            "funnel-runner",
        );

        // Most visitors answer something; roughly a third finish.
        let answered = rng.gen_range(0..=QUESTIONS.len());
        let completes = answered == QUESTIONS.len() && rng.gen_bool(0.55);
        let mut total_ms: u64 = 0;

        for (step, question) in QUESTIONS.iter().take(answered).enumerate() {
            let option = question
                .options
                .choose(&mut rng)
                .expect("question without options");
            let tempo = rng.gen_range(2_500..22_000);
            total_ms += tempo;
            tracker.record_answer(question.id, option.text, option.points, tempo, step + 1);

            if rng.gen_bool(0.08) {
                tracker.navigate_back(step + 1);
            }
        }

        if completes {
            let contato = Contact {
                nome: format!("Maria Teste {n}"),
                email: format!("maria.teste{n}@exemplo.com"),
                telefone: "11999999999".to_string(),
                idade: Some(rng.gen_range(38..58)),
            };
            match tracker.complete_quiz(contato, total_ms) {
                Ok(lead) => log::debug!(
                    "lead {} ({} pts, {})",
                    lead.id,
                    lead.qualificacao.score,
                    lead.qualificacao.categoria.as_str()
                ),
                Err(e) => log::warn!("conclusão falhou na sessão {n}: {e}"),
            }
        }
    }

    print_summary(&store)?;
    Ok(())
}

fn print_summary(store: &LocalStore) -> Result<()> {
    let aggregator = Aggregator::new(store.reopen()?, VariantCatalog::default());
    let metrics = aggregator.compute_metrics(None)?;

    println!("=== RESUMO DO FUNIL ===");
    println!("  views:        {}", metrics.total_views);
    println!("  leads:        {}", metrics.total_leads);
    println!("  conversão:    {:.1}%", metrics.taxa_conversao);
    println!();
    println!("=== POR VARIANTE ===");
    for (nome, v) in &metrics.variantes {
        println!(
            "  {nome:<18} | views: {:>4} | leads: {:>3} | conv: {:>5.1}% | \
             muito quentes: {} | quentes: {} | mornos: {} | frios: {}",
            v.views,
            v.leads,
            v.taxa_conversao,
            v.qualificacao.muito_quentes,
            v.qualificacao.quentes,
            v.qualificacao.mornos,
            v.qualificacao.frios,
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
