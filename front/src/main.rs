use chrono::NaiveDate;
use clap::Parser;
use front::{Client, Session, VoiceCommand};
use ripple_api::v1::NewTodo;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

#[derive(Parser, Debug)]
struct Args {
    /// Base url of the todo service.
    #[arg(long, default_value = "http://localhost:7890/api/v1")]
    url: String,

    /// Session token.
    #[arg(long)]
    token: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut session = Session::new(Client::new(args.url, args.token));
    session.initialize().await?;

    let mut updates = (session.take_updates()).ok_or_else(|| eyre::eyre!("no push subscription"))?;

    print_todos(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };

                if !run_command(&mut session, line.trim()).await? {
                    break;
                }
            }
            todos = updates.next() => {
                let Some(todos) = todos else { break };

                session.apply_push(todos);
                print_todos(&session);
            }
        }
    }

    Ok(())
}

async fn run_command(session: &mut Session, line: &str) -> eyre::Result<bool> {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "quit" | "exit" => return Ok(false),
        "list" => print_todos(session),
        "cats" => {
            for category in session.categories() {
                println!("{} ({})", category.name, category.color);
            }
        }
        "add" => {
            if rest.is_empty() {
                println!("usage: add TITLE");
            } else {
                let draft = NewTodo {
                    title: rest.to_string(),
                    ..Default::default()
                };

                report(session.add_todo(draft).await);
                print_todos(session);
            }
        }
        "done" => match nth_id(session, rest) {
            Some(id) => {
                report(session.toggle_todo(id).await);
                print_todos(session);
            }
            None => println!("usage: done INDEX"),
        },
        "rm" => match nth_id(session, rest) {
            Some(id) => {
                report(session.delete_todo(id).await);
                print_todos(session);
            }
            None => println!("usage: rm INDEX"),
        },
        "search" => {
            session.set_search(rest);
            print_todos(session);
        }
        "date" => {
            if rest.is_empty() || rest == "clear" {
                session.set_due_filter(None);
            } else {
                match rest.parse::<NaiveDate>() {
                    Ok(day) => session.set_due_filter(Some(day)),
                    Err(err) => {
                        println!("bad date: {err}");
                        return Ok(true);
                    }
                }
            }

            print_todos(session);
        }
        "voice" => match session.voice_command(rest).await {
            Ok(VoiceCommand::Unrecognized) => println!("did not catch that"),
            Ok(_) => print_todos(session),
            Err(err) => println!("error: {err}"),
        },
        _ => println!("commands: list add done rm search date voice cats quit"),
    }

    Ok(true)
}

fn nth_id(session: &Session, rest: &str) -> Option<Uuid> {
    let index: usize = rest.parse().ok()?;
    session.visible().get(index).map(|todo| todo.id)
}

fn report(result: eyre::Result<()>) {
    if let Err(err) = result {
        println!("error: {err}");
    }
}

fn print_todos(session: &Session) {
    for (index, todo) in session.visible().iter().enumerate() {
        let mark = if todo.completed { "x" } else { " " };
        let mut line = format!("{index:>3} [{mark}] {}", todo.title);

        if let Some(due) = todo.due_date {
            line.push_str(&format!(" (due {})", due.date_naive()));
        }

        if let Some(category) = &todo.category {
            line.push_str(&format!(" #{category}"));
        }

        println!("{line}");
    }
}
