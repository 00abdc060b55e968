//! SWADE Initiative - Entry Point
//!
//! Interactive encounter runner. Builds an in-memory table with a few demo
//! combatants and lets you step through rounds, holds and interrupts from the
//! terminal.

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use swade_initiative::cards::ActionDeck;
use swade_initiative::combat::{Combat, CombatEngine, Combatant, RollOptions};
use swade_initiative::core::types::CombatId;
use swade_initiative::core::InitiativeConfig;
use swade_initiative::host::memory::{
    MemoryActors, MemoryCombatStore, MemoryDeckStore, MemoryEffectStore,
};
use swade_initiative::host::{CardChoice, CardPrompt, CombatEvent, Host, PickRequest};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;

/// Interactive SWADE action-card initiative tracker
#[derive(Parser, Debug)]
#[command(name = "swade-initiative")]
#[command(about = "Step an encounter through SWADE action-card initiative")]
struct Args {
    /// TOML file with initiative settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the deck shuffle
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Keep the best card automatically instead of asking
    #[arg(long)]
    auto_pick: bool,
}

/// Card choice from the terminal, or automatic best-card pick
enum CliPrompt {
    Console,
    Auto,
}

impl CardPrompt for CliPrompt {
    async fn choose(&self, request: &PickRequest) -> CardChoice {
        let best = request
            .candidates
            .iter()
            .max_by_key(|c| (c.value, c.suit))
            .map_or(CardChoice::Cancelled, |c| CardChoice::Keep(c.id));
        if matches!(self, CliPrompt::Auto) {
            return best;
        }

        println!("\n{} picks a card:", request.combatant_name);
        for (i, card) in request.candidates.iter().enumerate() {
            println!("  {}) {}", i + 1, card.name);
        }
        if request.enable_redraw {
            println!("  r) redraw");
        }
        print!("choice> ");
        if io::stdout().flush().is_err() {
            return CardChoice::Cancelled;
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return CardChoice::Cancelled;
        }
        let input = input.trim();
        if input == "r" && request.enable_redraw {
            return CardChoice::Redraw;
        }
        input
            .parse::<usize>()
            .ok()
            .and_then(|n| request.candidates.get(n.wrapping_sub(1)))
            .map_or(CardChoice::Cancelled, |c| CardChoice::Keep(c.id))
    }
}

struct CliHost {
    decks: MemoryDeckStore,
    store: MemoryCombatStore,
    prompt: CliPrompt,
    effects: MemoryEffectStore,
    actors: MemoryActors,
}

impl Host for CliHost {
    type Deck = MemoryDeckStore;
    type Store = MemoryCombatStore;
    type Prompt = CliPrompt;
    type Effects = MemoryEffectStore;
    type Actors = MemoryActors;

    fn deck(&self) -> &Self::Deck {
        &self.decks
    }

    fn store(&self) -> &Self::Store {
        &self.store
    }

    fn prompt(&self) -> &Self::Prompt {
        &self.prompt
    }

    fn effects(&self) -> &Self::Effects {
        &self.effects
    }

    fn actors(&self) -> &Self::Actors {
        &self.actors
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("swade_initiative=debug")
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => InitiativeConfig::load(path)?,
        None => InitiativeConfig::default(),
    };
    config.validate()?;

    let rt = Runtime::new()?;

    let actors = MemoryActors::new();
    let combatants = demo_combatants(&actors);
    let host = CliHost {
        decks: MemoryDeckStore::with_deck(config.action_deck.clone(), ActionDeck::standard(args.seed)),
        store: MemoryCombatStore::new(),
        prompt: if args.auto_pick {
            CliPrompt::Auto
        } else {
            CliPrompt::Console
        },
        effects: MemoryEffectStore::new(),
        actors,
    };
    let engine = CombatEngine::new(
        Combat::with_combatants(CombatId::new(), combatants),
        host,
        config,
    );
    let mut events = engine.events().subscribe();

    println!("\n=== SWADE INITIATIVE ===");
    println!();
    println!("Commands:");
    println!("  start             - Deal cards and begin round 1");
    println!("  next / n          - Next turn");
    println!("  round / r         - Next round");
    println!("  draw              - Draw for everyone without a card");
    println!("  hold <name>       - Go on hold");
    println!("  now <name>        - Held combatant acts before the current one");
    println!("  after <name>      - Held combatant acts after the current one");
    println!("  lose <name>       - Held combatant loses their turn");
    println!("  down <name>       - Mark defeated (up <name> to revive)");
    println!("  add <name>        - Add a combatant");
    println!("  remove <name>     - Remove a combatant");
    println!("  group <lead> <n>  - Put <n> in <lead>'s group");
    println!("  leave <name>      - Leave a group");
    println!("  reset             - Clear all cards and reshuffle");
    println!("  status / s        - Show the turn order");
    println!("  end               - End combat");
    println!("  quit / q          - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();
        let result = rt.block_on(async {
            let combat = engine.snapshot().await;
            let find = |name: &str| {
                combat
                    .turns()
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(name))
                    .map(|c| c.id)
            };

            match command {
                "start" => engine.start_combat().await.map(|a| format!("{a:?}")),
                "next" | "n" => engine.next_turn().await.map(|a| format!("{a:?}")),
                "round" | "r" => engine.next_round().await.map(|a| format!("{a:?}")),
                "draw" => engine
                    .roll_all(RollOptions::default())
                    .await
                    .map(|_| "Cards dealt".to_string()),
                "reset" => engine.reset_all().await.map(|_| "Initiative reset".to_string()),
                "end" => engine.end_combat().await.map(|_| "Combat over".to_string()),
                "status" | "s" => Ok(String::new()),
                "add" if !rest.is_empty() => engine
                    .add_combatant(Combatant::new(rest, None))
                    .await
                    .map(|_| format!("Added {rest}")),
                "group" => {
                    let mut names = rest.split_whitespace();
                    match (names.next().and_then(find), names.next().and_then(find)) {
                        (Some(leader), Some(follower)) => engine
                            .join_group(leader, follower)
                            .await
                            .map(|_| "Grouped".to_string()),
                        _ => Ok("Usage: group <leader> <follower>".to_string()),
                    }
                }
                _ => match find(rest) {
                    None => Ok(format!("Unknown command or combatant: {input}")),
                    Some(id) => match command {
                        "hold" => engine.hold(id).await.map(|_| format!("{rest} is on hold")),
                        "now" => engine.act_now(id).await.map(|_| format!("{rest} acts now")),
                        "after" => engine
                            .act_after_current(id)
                            .await
                            .map(|_| format!("{rest} acts next")),
                        "lose" => engine.lose_turn(id).await.map(|_| format!("{rest} lost the turn")),
                        "down" => engine.set_defeated(id, true).await.map(|_| format!("{rest} is down")),
                        "up" => engine.set_defeated(id, false).await.map(|_| format!("{rest} is back up")),
                        "remove" => engine.remove_combatant(id).await.map(|_| format!("Removed {rest}")),
                        "leave" => engine.leave_group(id).await.map(|_| format!("{rest} left the group")),
                        _ => Ok(format!("Unknown command: {command}")),
                    },
                },
            }
        });

        match result {
            Ok(message) if !message.is_empty() => println!("{message}"),
            Ok(_) => {}
            Err(e) => println!("Error: {e}"),
        }
        drain_events(&mut events);
        display_status(&rt.block_on(engine.snapshot()));
    }

    println!("\nGoodbye!");
    Ok(())
}

/// A small skirmish: three heroes against a bandit gang
fn demo_combatants(actors: &MemoryActors) -> Vec<Combatant> {
    let gabe = actors.add(&["quick"], true);
    let red = actors.add(&["level-headed"], true);
    let valeria = actors.add(&["hesitant"], true);
    let boss = actors.add(&[], false);

    let mut bandit_boss = Combatant::new("Boss", Some(boss));
    bandit_boss.group_id = Some(bandit_boss.id);
    bandit_boss.is_group_leader = true;
    let mut bandits: Vec<Combatant> = ["Bandit1", "Bandit2"]
        .into_iter()
        .map(|name| {
            let mut bandit = Combatant::new(name, None);
            bandit.group_id = Some(bandit_boss.id);
            bandit
        })
        .collect();

    let mut combatants = vec![
        Combatant::new("Gabe", Some(gabe)),
        Combatant::new("Red", Some(red)),
        Combatant::new("Valeria", Some(valeria)),
        bandit_boss,
    ];
    combatants.append(&mut bandits);
    combatants
}

fn drain_events(events: &mut broadcast::Receiver<CombatEvent>) {
    loop {
        match events.try_recv() {
            Ok(CombatEvent::InitiativeDrawn { name, card, .. }) => {
                println!("  {name} drew {}", card.name)
            }
            Ok(CombatEvent::JokersWild { .. }) => println!("  Jokers are wild! Everyone gets a Benny."),
            Ok(CombatEvent::DeckReshuffled { deck }) => println!("  {deck} reshuffled"),
            Ok(CombatEvent::Warning { message }) => println!("  ! {message}"),
            Ok(CombatEvent::EffectExpired { label, .. }) => println!("  {label} wore off"),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

fn display_status(combat: &Combat) {
    println!();
    println!("--- Round {} ({:?}) ---", combat.round, combat.phase);
    for (i, c) in combat.turns().iter().enumerate() {
        let marker = if combat.round > 0 && i == combat.turn { ">" } else { " " };
        let card = match c.initiative() {
            Some((value, suit)) => format!("{value:>2} / {suit:.2}"),
            None => "  --   ".to_string(),
        };
        let mut flags = Vec::new();
        if c.has_joker {
            flags.push("joker");
        }
        if c.is_on_hold() {
            flags.push("hold");
        }
        if c.turn_lost {
            flags.push("lost");
        }
        if c.defeated {
            flags.push("down");
        }
        if c.is_follower() {
            flags.push("follower");
        }
        println!("{marker} {card}  {:<10} {}", c.name, flags.join(" "));
    }
    println!();
}
