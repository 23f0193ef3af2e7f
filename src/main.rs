//! precinct 终端对话
//!
//! 入口：初始化日志与配置，创建对话编排器，逐行读取输入。
//! 指令：/agent <id>、/select <id>、/deselect <id>、/agents、/reset、/clear、/quit

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use precinct::agents::AgentRegistry;
use precinct::chat::{ChatMessage, ChatOrchestrator, FileStore};
use precinct::config::{load_config, AppConfig};

fn print_message(registry: &AgentRegistry, message: &ChatMessage) {
    println!("\n[{}]\n{}\n", registry.display_name(&message.agent_type), message.content);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    precinct::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let registry = AgentRegistry::from_agents(cfg.agents.clone());
    let storage = Arc::new(FileStore::new(cfg.app.storage_dir()));
    let chat = ChatOrchestrator::from_config(&cfg, storage).context("Failed to create chat")?;
    let restored = chat.load().await;
    if restored > 0 {
        println!("Restored {} messages. Type /clear to start over.", restored);
    }
    println!("Agents: {}", registry.ids().collect::<Vec<_>>().join(", "));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", chat.current_agent().await);
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let line = line.trim();
        let (command, arg) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/clear" => {
                chat.clear().await;
                println!("History cleared.");
            }
            "/reset" => {
                let greeting = chat.reset_murder_session().await;
                print_message(&registry, &greeting);
            }
            "/agents" => {
                let selected = chat.selected_agents().await;
                for agent in registry.all() {
                    let mark = if selected.contains(&agent.id) { "*" } else { " " };
                    println!("{} {:<24} {}", mark, agent.id, agent.name);
                }
            }
            "/agent" | "/select" | "/deselect" if registry.get(arg).is_none() => {
                println!("Unknown agent: {}", arg);
            }
            "/agent" => {
                let before = chat.messages().await.len();
                chat.set_current_agent(arg, None).await;
                for message in chat.messages().await.iter().skip(before) {
                    print_message(&registry, message);
                }
            }
            "/select" => {
                if !chat.select_agent(arg).await {
                    println!("{} is already selected.", arg);
                }
            }
            "/deselect" => {
                if !chat.deselect_agent(arg).await {
                    println!("Cannot deselect {}.", arg);
                }
            }
            _ => {
                for message in chat.send(line).await.iter().skip(1) {
                    print_message(&registry, message);
                }
            }
        }
    }

    Ok(())
}
