//! Subcommand handlers

use crate::{Commands, DaxCommands, OutputArgs, OutputFormat, Target};
use anyhow::{bail, Context, Result};
use daxpilot_core::analytics::{AzureTextAnalytics, KeywordAnalyzer, TextAnalyzer};
use daxpilot_core::chat::{ChatReply, ChatSession, ModelSelection};
use daxpilot_core::config::{AppConfig, SafeLogging};
use daxpilot_core::dax::{validate_dax, DaxGenerator};
use daxpilot_core::executor::QueryResult;
use daxpilot_core::foundry::FoundryClient;
use daxpilot_core::github::GitHubStats;
use daxpilot_core::http::HttpClient;
use daxpilot_core::session::SessionContext;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub async fn run(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Chat {
            prompt,
            model,
            demo,
        } => chat(config, prompt, model, demo).await,
        Commands::Route { prompt } => route(config, &prompt),
        Commands::Models { refresh } => models(config, refresh).await,
        Commands::Auth => auth(config).await,
        Commands::Workspaces { refresh } => workspaces(config, refresh).await,
        Commands::Datasets { workspace } => datasets(config, &workspace).await,
        Commands::Tables { target } => tables(config, target).await,
        Commands::Dax { command } => dax(config, command).await,
        Commands::Query {
            dax,
            target,
            output,
        } => query(config, &dax, target, output).await,
        Commands::Ask {
            question,
            model,
            target,
            output,
        } => ask(config, &question, model, target, output).await,
        Commands::Insights { text, mock, export } => insights(config, &text, mock, export).await,
        Commands::GithubStats { repo, refresh } => github_stats(config, repo, refresh).await,
        Commands::Config => {
            println!("{}", config.safe_for_logging());
            Ok(())
        }
    }
}

async fn chat(
    config: AppConfig,
    prompt: Option<String>,
    model: Option<String>,
    demo: bool,
) -> Result<()> {
    let mut client = FoundryClient::new(config.foundry.clone())?;
    let router = if demo || !client.is_available().await {
        if !demo {
            warn!("Foundry Local is not reachable, using the configured models");
        }
        client.configured_router()
    } else {
        client.router().await
    };

    let selection = model.map_or(ModelSelection::Auto, ModelSelection::Manual);
    let mut session = ChatSession::new(Arc::new(client), router)
        .with_selection(selection)
        .with_demo_mode(demo);

    if let Some(prompt) = prompt {
        let reply = answer(&mut session, &prompt).await?;
        print_reply(&reply);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Type a prompt, /clear to reset the conversation, /quit to leave.");
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                eprintln!("Conversation cleared.");
            }
            prompt => match answer(&mut session, prompt).await {
                Ok(reply) => print_reply(&reply),
                Err(e) => eprintln!("error: {:#}", e),
            },
        }
    }
    Ok(())
}

/// Ask once, answering with the demo reply when the server is unreachable
async fn answer(session: &mut ChatSession, prompt: &str) -> Result<ChatReply> {
    match session.ask(prompt).await {
        Ok(reply) => Ok(reply),
        Err(e) if e.is_connection_failure() => {
            warn!("Cannot reach Foundry Local ({}), replying in demo mode", e);
            Ok(session.demo_fallback()?)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_reply(reply: &ChatReply) {
    let mut label = reply.model.clone();
    if let Some(route) = &reply.route {
        label = format!("{} ({})", label, route.reason);
    }
    if reply.demo {
        label.push_str(" [demo]");
    }
    eprintln!("-- {}", label);
    println!("{}", reply.content);
}

fn route(config: AppConfig, prompt: &str) -> Result<()> {
    let client = FoundryClient::new(config.foundry)?;
    let decision = client.configured_router().route(prompt)?;
    println!(
        "{} ({:?}): {}",
        decision.model, decision.tier, decision.reason
    );
    Ok(())
}

async fn models(config: AppConfig, refresh: bool) -> Result<()> {
    let mut client = FoundryClient::new(config.foundry)?;
    let available = client.is_available().await;
    for model in client.list_models(refresh).await {
        println!("{}", model);
    }
    if !available {
        eprintln!("(server unreachable, showing the fallback list)");
    }
    Ok(())
}

/// Session with a token already acquired
async fn signed_in(config: AppConfig) -> Result<SessionContext> {
    let mut session = SessionContext::new(config)?;
    session
        .authenticate()
        .await
        .context("acquiring a Power BI token")?;
    Ok(session)
}

fn apply_target(session: &mut SessionContext, target: Target) {
    if let Some(workspace) = target.workspace {
        session.select_workspace(workspace);
    }
    if let Some(dataset) = target.dataset {
        session.select_dataset(dataset);
    }
}

async fn auth(config: AppConfig) -> Result<()> {
    let session = signed_in(config).await?;
    match session.tokens().expires_at() {
        Some(expires_at) => println!("Authenticated, token valid until {}", expires_at),
        None => println!("Authenticated"),
    }
    session.end()?;
    Ok(())
}

async fn workspaces(config: AppConfig, refresh: bool) -> Result<()> {
    let mut session = signed_in(config).await?;
    for workspace in session.workspaces(refresh).await? {
        println!("{}\t{}", workspace.id, workspace.name);
    }
    session.end()?;
    Ok(())
}

async fn datasets(config: AppConfig, workspace: &str) -> Result<()> {
    let session = signed_in(config).await?;
    for dataset in session.datasets(workspace).await? {
        println!("{}\t{}", dataset.id, dataset.name);
    }
    session.end()?;
    Ok(())
}

async fn tables(config: AppConfig, target: Target) -> Result<()> {
    let mut session = signed_in(config).await?;
    apply_target(&mut session, target);
    for table in session.tables().await? {
        println!(
            "{}\t{} columns\t{} measures",
            table.name,
            table.columns.len(),
            table.measures.len()
        );
    }
    session.end()?;
    Ok(())
}

fn generator(config: &AppConfig, model: Option<String>) -> Result<DaxGenerator> {
    let client = FoundryClient::new(config.foundry.clone())?;
    let model = model.unwrap_or_else(|| config.foundry.powerful_model.clone());
    Ok(DaxGenerator::new(Arc::new(client), model))
}

fn report_validation(query: &str) -> bool {
    let validation = validate_dax(query);
    for issue in &validation.issues {
        eprintln!("warning: {}", issue);
    }
    validation.is_valid()
}

async fn dax(config: AppConfig, command: DaxCommands) -> Result<()> {
    match command {
        DaxCommands::Generate { question, model } => {
            let query = generator(&config, model)?.generate(&question).await?;
            report_validation(&query);
            println!("{}", query);
        }
        DaxCommands::Validate { query } => {
            if !report_validation(&query) {
                bail!("query failed validation");
            }
            println!("DAX query looks valid");
        }
        DaxCommands::Refine {
            query,
            feedback,
            model,
        } => {
            let refined = generator(&config, model)?.refine(&query, &feedback).await?;
            report_validation(&refined);
            println!("{}", refined);
        }
    }
    Ok(())
}

fn render(result: &QueryResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Csv => result.to_csv()?,
        OutputFormat::Json => result.to_json()?,
        OutputFormat::Summary => serde_json::to_string_pretty(&result.summary())?,
    })
}

fn write_output(result: &QueryResult, output: &OutputArgs) -> Result<()> {
    let rendered = render(result, output.format)?;
    match &output.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} rows to {}", result.rows.len(), path.display());
        }
        None => println!("{}", rendered.trim_end()),
    }
    Ok(())
}

async fn query(config: AppConfig, dax: &str, target: Target, output: OutputArgs) -> Result<()> {
    report_validation(dax);
    let mut session = signed_in(config).await?;
    apply_target(&mut session, target);

    let result = session.execute(dax).await?;
    write_output(result, &output)?;
    session.end()?;
    Ok(())
}

async fn ask(
    config: AppConfig,
    question: &str,
    model: Option<String>,
    target: Target,
    output: OutputArgs,
) -> Result<()> {
    let query = generator(&config, model)?.generate(question).await?;
    report_validation(&query);
    eprintln!("{}", query);

    let mut session = signed_in(config).await?;
    apply_target(&mut session, target);
    let result = session.execute(&query).await?;
    write_output(result, &output)?;
    session.end()?;
    Ok(())
}

async fn insights(
    config: AppConfig,
    text: &str,
    mock: bool,
    export: Option<std::path::PathBuf>,
) -> Result<()> {
    let http = HttpClient::new()?;
    let service = if mock {
        None
    } else {
        AzureTextAnalytics::from_config(http.clone(), &config.analytics)
    };
    let analyzer: Box<dyn TextAnalyzer> = match service {
        Some(service) => Box::new(service),
        None => {
            info!("Using keyword analyzer");
            Box::new(KeywordAnalyzer::new())
        }
    };

    let nlp = analyzer.analyze(text).await?;
    let mut session = SessionContext::with_http(config, http);
    let insight = session.insights_mut().generate(&nlp);
    println!("{}", serde_json::to_string_pretty(&insight)?);

    if let Some(path) = export {
        session.insights().export(&path)?;
    }
    session.end()?;
    Ok(())
}

async fn github_stats(config: AppConfig, repo: Option<String>, refresh: bool) -> Result<()> {
    let Some(repo) = repo.or_else(|| config.github.repository.clone()) else {
        bail!("no repository given and GITHUB_REPOSITORY is not set");
    };
    let mut github = GitHubStats::new(HttpClient::new()?, &config.github, config.cache.ttl());
    let stats = github.repo_stats(&repo, refresh).await?;
    println!(
        "{}\n  stars: {}\n  forks: {}\n  watchers: {}\n  open issues: {}\n  {}",
        stats.full_name, stats.stars, stats.forks, stats.watchers, stats.open_issues, stats.html_url
    );
    Ok(())
}
