use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{
    env,
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
};

use signpose::config::{self, ConfigState};
use signpose::pipeline::{self, RunOptions, Selection};
use signpose::sim::Script;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // Options first; pico-args only hands out free args once they are consumed.
    let config_dir: Option<PathBuf> = pargs.opt_value_from_str("--config-dir")?;
    let profile: Option<String> = pargs.opt_value_from_str("--profile")?;
    let script: Option<PathBuf> = pargs.opt_value_from_str("--script")?;
    let pose: Option<usize> = pargs.opt_value_from_str("--pose")?;
    let seed: Option<u64> = pargs.opt_value_from_str("--seed")?;
    let quiz = pargs.contains("--quiz");
    let realtime = pargs.contains("--realtime");

    let subcmd: Option<String> = pargs.free_from_str().ok();

    let load = || -> Result<ConfigState> {
        let dir = match &config_dir {
            Some(d) => d.clone(),
            None => config::default_config_dir()?,
        };
        let st = ConfigState::load_or_install_default(&dir)?;
        match &profile {
            Some(name) => st.with_profile(name),
            None => Ok(st),
        }
    };

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("list") => {
            let st = load()?;
            let list = st.list_profiles();
            print_response(&serde_json::json!({
                "ok": true,
                "data": {"profiles": list, "active": st.active_name}
            }));
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: signpose use <profile_name>"))?;
            let mut st = load()?;
            let resp = match st.set_active(&name) {
                Ok(_) => serde_json::json!({"ok": true, "data": {"active_profile": st.active_name}}),
                Err(e) => serde_json::json!({"ok": false, "error": e.to_string()}),
            };
            print_response(&resp);
            Ok(())
        }

        Some("poses") => {
            let st = load()?;
            let poses: Vec<_> = st
                .profile
                .poses
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    serde_json::json!({
                        "index": i,
                        "name": p.name,
                        "description": p.description,
                        "preview": p.preview,
                        "hand_shape": p.hand_shape,
                    })
                })
                .collect();
            print_response(&serde_json::json!({"ok": true, "data": {"poses": poses}}));
            Ok(())
        }

        Some("doctor") => {
            let st = load()?;
            let mut report = st.doctor_report();
            let detectors = pipeline::probe_detectors(&st.profile);
            let inert: Vec<_> = detectors
                .iter()
                .filter(|d| d.binding.is_none())
                .map(|d| d.name.clone())
                .collect();
            report["detectors"] = serde_json::to_value(&detectors)?;
            report["inert_detectors"] = serde_json::json!(inert);
            print_response(&serde_json::json!({"ok": true, "data": report}));
            Ok(())
        }

        Some("run") => {
            let st = load()?;
            let script = match &script {
                Some(path) => Script::load(path)?,
                None => Script::demo()?,
            };
            let selection = match pose {
                Some(index) => Selection::Fixed(index),
                None => Selection::Learn { quiz, seed },
            };

            let stop = Arc::new(AtomicBool::new(false));
            signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&stop))?;
            signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&stop))?;

            let opts = RunOptions {
                script,
                selection,
                realtime,
            };
            let summary = pipeline::run(&st.profile, opts, &stop)?;
            print_response(&serde_json::json!({"ok": true, "data": summary}));
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!(
        r#"signpose: hold-confirmed hand pose trainer

USAGE:
  signpose [--config-dir DIR] [--profile NAME] <command>

COMMANDS:
  signpose help [command]            Show general or command-specific help
  signpose list                      List profiles
  signpose use <name>                Switch active profile
  signpose poses                     List poses of the active profile
  signpose doctor                    Show config paths and detector bindings
  signpose run [--script FILE] [--pose N] [--quiz] [--seed N] [--realtime]
                                     Replay a hand-observation script

TIPS:
  - Profiles: ~/.config/signpose/profiles
  - Active profile pointer: ~/.config/signpose/active
  - RUST_LOG=debug shows injection and hold-timer details
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "list" => {
            println!("usage: signpose list\nLists available profiles and the active one.")
        }
        "use" => {
            println!("usage: signpose use <name>\nSwitches the active profile to <name>.")
        }
        "poses" => println!("usage: signpose poses\nLists the pose library with indices."),
        "doctor" => println!(
            "usage: signpose doctor\nShows config paths and how each detector accepts a pose;\ndetectors listed as inert will never match."
        ),
        "run" => println!(
            "usage: signpose run [--script FILE] [--pose N] [--quiz] [--seed N] [--realtime]\n\
             Replays FILE (default: bundled demo). --pose holds library index N for the whole\n\
             run; otherwise poses are picked at random and advance after each match.\n\
             --quiz starts in quiz mode and keeps score. Ctrl-C stops the replay."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
