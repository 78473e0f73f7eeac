use chrono::{Datelike, NaiveDate, Utc};
use clap::{Arg, ArgMatches, Command};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::PathBuf};

use taskdeck::app::AppState;
use taskdeck::config::{parse_bool, Config, CONFIG_FILE};
use taskdeck::error::AppError;
use taskdeck::integrations::{connect_url, Service};
use taskdeck::logging;
use taskdeck::meeting::{filter_meetings, meeting_catalog};
use taskdeck::session::AuthStatus;
use taskdeck::settings::{Notifications, Theme};
use taskdeck::store::Source;
use taskdeck::task::{
    parse_due_date, NewTask, NewUser, Priority, Role, Task, TaskFilters, TaskStatus, User, UserUpdate,
};
use taskdeck::ui;

fn cli() -> Command {
    Command::new("taskdeck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Terminal kanban board for the team dashboard")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Path to the config file (default: ./taskdeck.json)"),
        )
        .subcommand(Command::new("board").about("Open the interactive board (default)"))
        .subcommand(
            Command::new("tasks")
                .about("Work with tasks")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("List tasks")
                        .arg(Arg::new("status").long("status").help("TODO, IN_PROGRESS or DONE"))
                        .arg(Arg::new("assignee").long("assignee").help("Assignee id"))
                        .arg(Arg::new("priority").long("priority").help("HIGH, MEDIUM or LOW")),
                )
                .subcommand(
                    Command::new("add")
                        .about("Create a task")
                        .arg(Arg::new("title").required(true).help("Task title"))
                        .arg(Arg::new("status").long("status"))
                        .arg(Arg::new("priority").long("priority"))
                        .arg(Arg::new("due").long("due").help("Due date, YYYY-MM-DD"))
                        .arg(Arg::new("assignee").long("assignee").help("Assignee id")),
                )
                .subcommand(
                    Command::new("move")
                        .about("Change a task's status")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("status").required(true)),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a task")
                        .arg(Arg::new("id").required(true)),
                ),
        )
        .subcommand(
            Command::new("login")
                .about("Finish a browser login from its redirect url")
                .arg(Arg::new("redirect-url").required(true)),
        )
        .subcommand(Command::new("logout").about("Forget stored credentials"))
        .subcommand(Command::new("whoami").about("Show the logged-in user"))
        .subcommand(
            Command::new("integrations")
                .about("Slack, Notion and Jira connections")
                .subcommand_required(true)
                .subcommand(Command::new("status").about("Show which services are connected"))
                .subcommand(
                    Command::new("connect")
                        .about("Print the url that starts the connect flow")
                        .arg(Arg::new("service").required(true)),
                )
                .subcommand(
                    Command::new("disconnect")
                        .about("Disconnect a service")
                        .arg(Arg::new("service").required(true)),
                ),
        )
        .subcommand(
            Command::new("checklist")
                .about("Meeting preparation checklist")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("Show the checklist"))
                .subcommand(
                    Command::new("add")
                        .about("Add an item")
                        .arg(Arg::new("text").required(true)),
                )
                .subcommand(
                    Command::new("toggle")
                        .about("Check or uncheck an item")
                        .arg(Arg::new("id").required(true)),
                )
                .subcommand(
                    Command::new("rename")
                        .about("Change an item's text")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("text").required(true)),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Remove an item")
                        .arg(Arg::new("id").required(true)),
                ),
        )
        .subcommand(
            Command::new("meeting")
                .about("Meeting notes")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("Search past meetings")
                        .arg(Arg::new("name").long("name"))
                        .arg(Arg::new("date").long("date").help("YYYY-MM-DD"))
                        .arg(Arg::new("participant").long("participant")),
                )
                .subcommand(
                    Command::new("derive")
                        .about("Derive action items from the decisions")
                        .arg(Arg::new("id").long("id").help("Switch to this meeting first")),
                ),
        )
        .subcommand(
            Command::new("users")
                .about("Workspace users on the backend")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List users of the current tenant"))
                .subcommand(Command::new("me").about("Show the backend's view of the current user"))
                .subcommand(
                    Command::new("add")
                        .about("Create a user")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("email").required(true))
                        .arg(Arg::new("role").long("role").help("OWNER, ADMIN or MEMBER")),
                )
                .subcommand(
                    Command::new("update")
                        .about("Change a user's name, email or role")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("name").long("name"))
                        .arg(Arg::new("email").long("email"))
                        .arg(Arg::new("role").long("role")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a user")
                        .arg(Arg::new("id").required(true)),
                ),
        )
        .subcommand(
            Command::new("settings")
                .about("Local preferences")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the current settings"))
                .subcommand(
                    Command::new("notifications")
                        .about("Turn notification kinds on or off")
                        .arg(Arg::new("push").long("push").help("on or off"))
                        .arg(Arg::new("meeting").long("meeting").help("on or off"))
                        .arg(Arg::new("deadline").long("deadline").help("on or off")),
                ),
        )
        .subcommand(
            Command::new("team")
                .about("Team roster")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("Show the roster"))
                .subcommand(
                    Command::new("add")
                        .about("Add a member")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("role").long("role").default_value(""))
                        .arg(Arg::new("email").long("email").default_value(""))
                        .arg(Arg::new("department").long("department").default_value("")),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Remove a member")
                        .arg(Arg::new("id").required(true)),
                ),
        )
        .subcommand(
            Command::new("theme")
                .about("Show or set the theme")
                .arg(Arg::new("value").help("light, dark or auto")),
        )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();
    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = Config::load(&config_path)?;
    logging::init_tracing(&config.data_dir)?;
    let mut app = AppState::open(config)?;

    let result = match matches.subcommand() {
        None | Some(("board", _)) => run_board(&mut app),
        Some(("tasks", sub)) => tasks_command(&mut app, sub),
        Some(("login", sub)) => login(&mut app, sub),
        Some(("logout", _)) => {
            app.logout();
            println!("Logged out.");
            Ok(())
        }
        Some(("whoami", _)) => {
            whoami(&app);
            Ok(())
        }
        Some(("integrations", sub)) => integrations_command(&app, sub),
        Some(("checklist", sub)) => checklist_command(&mut app, sub),
        Some(("meeting", sub)) => meeting_command(&mut app, sub),
        Some(("users", sub)) => users_command(&app, sub),
        Some(("settings", sub)) => settings_command(&mut app, sub),
        Some(("team", sub)) => team_command(&mut app, sub),
        Some(("theme", sub)) => theme_command(&mut app, sub),
        Some((other, _)) => Err(AppError::Usage(format!("unknown command {other}"))),
    };
    app.shutdown();
    result?;
    Ok(())
}

fn run_board(app: &mut AppState) -> Result<(), AppError> {
    // Failures land on the status line.
    let _ = app.refresh();

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("{:?}", err);
    }
    Ok(())
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Option<&'a str> {
    matches.get_one::<String>(name).map(String::as_str)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, AppError> {
    arg(matches, name).ok_or_else(|| AppError::Usage(format!("missing <{name}>")))
}

fn parse_with<T>(
    value: Option<&str>,
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, AppError> {
    value
        .map(|v| parse(v).ok_or_else(|| AppError::Usage(format!("invalid {what}: {v}"))))
        .transpose()
}

fn print_task(task: &Task) {
    let assignee = task
        .assignee
        .as_ref()
        .map(|a| format!(" @{}", a.display_name()))
        .unwrap_or_default();
    let due = task.due_date.map(|d| format!(" (Due: {d})")).unwrap_or_default();
    println!(
        "[{}] {:<11} {:<6} {}{}{}",
        task.id, task.status, task.priority, task.title, assignee, due
    );
}

fn tasks_command(app: &mut AppState, matches: &ArgMatches) -> Result<(), AppError> {
    match matches.subcommand() {
        Some(("list", sub)) => {
            let filters = TaskFilters {
                status: parse_with(arg(sub, "status"), "status", TaskStatus::parse)?,
                assignee_id: arg(sub, "assignee").map(str::to_string),
                priority: parse_with(arg(sub, "priority"), "priority", Priority::parse)?,
            };
            let listing = app.tasks.list(&filters)?;
            if listing.source == Source::Fallback {
                println!("(backend unavailable, showing demo data)");
            }
            for status in TaskStatus::ALL {
                for task in listing.tasks.iter().filter(|t| t.status == status) {
                    print_task(task);
                }
            }
        }
        Some(("add", sub)) => {
            let task = NewTask {
                status: parse_with(arg(sub, "status"), "status", TaskStatus::parse)?,
                priority: parse_with(arg(sub, "priority"), "priority", Priority::parse)?,
                due_date: parse_with(arg(sub, "due"), "due date", parse_due_date)?,
                assignee_id: arg(sub, "assignee").map(str::to_string),
                ..NewTask::titled(required(sub, "title")?)
            };
            let created = app.tasks.create(&task)?;
            print_task(&created);
        }
        Some(("move", sub)) => {
            let id = required(sub, "id")?;
            let status = parse_with(Some(required(sub, "status")?), "status", TaskStatus::parse)?
                .unwrap_or(TaskStatus::Todo);
            app.refresh()?;
            if app.board.find(id).is_none() {
                return Err(AppError::Usage(format!("no task {id}")));
            }
            if app.board.change_status(&app.tasks, id, status)? {
                println!("{id} -> {status}");
            } else {
                println!("{id} is already {status}");
            }
        }
        Some(("delete", sub)) => {
            let id = required(sub, "id")?;
            app.tasks.delete(id)?;
            println!("Deleted {id}.");
        }
        _ => unreachable!("clap requires a tasks subcommand"),
    }
    Ok(())
}

fn login(app: &mut AppState, matches: &ArgMatches) -> Result<(), AppError> {
    let claims = app.complete_login(required(matches, "redirect-url")?)?;
    println!("Logged in as {}.", claims.display_name());
    Ok(())
}

fn whoami(app: &AppState) {
    match app.session.status(Utc::now().timestamp()) {
        AuthStatus::Authenticated(claims) => {
            println!("{}", claims.display_name());
            if let Some(email) = &claims.email {
                println!("email:  {email}");
            }
            println!("tenant: {}", app.session.tenant_slug());
        }
        AuthStatus::LoginRequired => println!("Not logged in."),
    }
}

fn service_arg(matches: &ArgMatches) -> Result<Service, AppError> {
    let value = required(matches, "service")?;
    Service::parse(value).ok_or_else(|| AppError::Usage(format!("unknown service {value}")))
}

fn integrations_command(app: &AppState, matches: &ArgMatches) -> Result<(), AppError> {
    match matches.subcommand() {
        Some(("status", _)) => {
            let status = app.tasks.integration_status()?;
            for service in Service::ALL {
                let state = if status.is_connected(service) { "connected" } else { "not connected" };
                println!("{service:<7} {state}");
            }
        }
        Some(("connect", sub)) => {
            let service = service_arg(sub)?;
            let claims = app.session.claims();
            let url = connect_url(
                &app.config.api_base_url,
                service,
                &app.session.tenant_slug(),
                claims.as_ref().and_then(|c| c.user_id()),
            )?;
            println!("Open this url to connect {service}:\n{url}");
        }
        Some(("disconnect", sub)) => {
            let message = app.tasks.disconnect(service_arg(sub)?)?;
            println!("{message}");
        }
        _ => unreachable!("clap requires an integrations subcommand"),
    }
    Ok(())
}

fn item_id(matches: &ArgMatches) -> Result<i64, AppError> {
    let value = required(matches, "id")?;
    value
        .parse()
        .map_err(|_| AppError::Usage(format!("invalid item id {value}")))
}

fn checklist_command(app: &mut AppState, matches: &ArgMatches) -> Result<(), AppError> {
    let checklist = &mut app.meeting.checklist;
    match matches.subcommand() {
        Some(("list", _)) => {}
        Some(("add", sub)) => {
            checklist.add(required(sub, "text")?)?;
        }
        Some(("toggle", sub)) => {
            let id = item_id(sub)?;
            if checklist.toggle(id)?.is_none() {
                return Err(AppError::Usage(format!("no checklist item {id}")));
            }
        }
        Some(("rename", sub)) => {
            let id = item_id(sub)?;
            if !checklist.rename(id, required(sub, "text")?)? {
                return Err(AppError::Usage(format!("no checklist item {id}")));
            }
        }
        Some(("remove", sub)) => {
            let id = item_id(sub)?;
            if !checklist.remove(id)? {
                return Err(AppError::Usage(format!("no checklist item {id}")));
            }
        }
        _ => unreachable!("clap requires a checklist subcommand"),
    }
    for item in checklist.items() {
        let mark = if item.completed { "x" } else { " " };
        println!("[{mark}] {:<14} {}", item.id, item.text);
    }
    Ok(())
}

fn meeting_command(app: &mut AppState, matches: &ArgMatches) -> Result<(), AppError> {
    let catalog = meeting_catalog();
    match matches.subcommand() {
        Some(("list", sub)) => {
            let date = parse_with(arg(sub, "date"), "date", |d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()
            })?;
            for meeting in filter_meetings(&catalog, arg(sub, "name"), date, arg(sub, "participant")) {
                println!(
                    "{:>2} {} {} ({})",
                    meeting.id,
                    meeting.date,
                    meeting.name,
                    meeting.participants.join(", ")
                );
            }
        }
        Some(("derive", sub)) => {
            match arg(sub, "id") {
                Some(id) => {
                    let record = catalog
                        .iter()
                        .find(|m| m.id.to_string() == id)
                        .ok_or_else(|| AppError::Usage(format!("no meeting {id}")))?;
                    app.meeting.select(record)?;
                }
                None => app.meeting.rederive(Utc::now().year())?,
            }
            let summary = app.meeting.summary.get();
            println!("Purpose:   {}", summary.purpose);
            println!("Decisions: {}", summary.decisions.replace('\n', "\n           "));
            println!();
            for task in app.meeting.derived.get() {
                println!(
                    "{:<24} {:<6} {:<6} due {}",
                    task.name, task.assignee, task.priority, task.due_date
                );
            }
        }
        _ => unreachable!("clap requires a meeting subcommand"),
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("[{}] {:<6} {} <{}>", user.id, user.role, user.name, user.email);
}

fn users_command(app: &AppState, matches: &ArgMatches) -> Result<(), AppError> {
    match matches.subcommand() {
        Some(("list", _)) => {
            for user in app.tasks.users()? {
                print_user(&user);
            }
        }
        Some(("me", _)) => match app.tasks.current_user()? {
            Some(user) => print_user(&user),
            None => println!("The backend does not know the current user."),
        },
        Some(("add", sub)) => {
            let user = NewUser {
                name: required(sub, "name")?.to_string(),
                email: required(sub, "email")?.to_string(),
                role: parse_with(arg(sub, "role"), "role", Role::parse)?,
                ..NewUser::default()
            };
            print_user(&app.tasks.create_user(&user)?);
        }
        Some(("update", sub)) => {
            let update = UserUpdate {
                name: arg(sub, "name").map(str::to_string),
                email: arg(sub, "email").map(str::to_string),
                role: parse_with(arg(sub, "role"), "role", Role::parse)?,
                ..UserUpdate::default()
            };
            print_user(&app.tasks.update_user(required(sub, "id")?, &update)?);
        }
        Some(("delete", sub)) => {
            let id = required(sub, "id")?;
            app.tasks.delete_user(id)?;
            println!("Deleted user {id}.");
        }
        _ => unreachable!("clap requires a users subcommand"),
    }
    Ok(())
}

fn settings_command(app: &mut AppState, matches: &ArgMatches) -> Result<(), AppError> {
    if let Some(("notifications", sub)) = matches.subcommand() {
        let current = app.preferences.settings().notifications;
        let switch = |name: &str, value: bool| {
            parse_with(arg(sub, name), name, parse_bool).map(|v| v.unwrap_or(value))
        };
        let notifications = Notifications {
            push: switch("push", current.push)?,
            meeting: switch("meeting", current.meeting)?,
            deadline: switch("deadline", current.deadline)?,
        };
        app.preferences.set_notifications(notifications)?;
    }
    let settings = app.preferences.settings();
    let state = |on: bool| if on { "on" } else { "off" };
    println!("theme:    {}", settings.theme);
    println!("push:     {}", state(settings.notifications.push));
    println!("meeting:  {}", state(settings.notifications.meeting));
    println!("deadline: {}", state(settings.notifications.deadline));
    Ok(())
}

fn team_command(app: &mut AppState, matches: &ArgMatches) -> Result<(), AppError> {
    let prefs = &mut app.preferences;
    match matches.subcommand() {
        Some(("list", _)) => {}
        Some(("add", sub)) => {
            let added = prefs.add_member(
                required(sub, "name")?,
                arg(sub, "role").unwrap_or_default(),
                arg(sub, "email").unwrap_or_default(),
                arg(sub, "department").unwrap_or_default(),
            )?;
            if added.is_none() {
                return Err(AppError::Usage("member name cannot be blank".to_string()));
            }
        }
        Some(("remove", sub)) => {
            let value = required(sub, "id")?;
            let id: u32 = value
                .parse()
                .map_err(|_| AppError::Usage(format!("invalid member id {value}")))?;
            if !prefs.remove_member(id)? {
                return Err(AppError::Usage(format!("no team member {id}")));
            }
        }
        _ => unreachable!("clap requires a team subcommand"),
    }
    for member in prefs.team() {
        println!(
            "{:>2} {:<8} {:<20} {:<24} {}",
            member.id, member.name, member.role, member.email, member.department
        );
    }
    Ok(())
}

fn theme_command(app: &mut AppState, matches: &ArgMatches) -> Result<(), AppError> {
    if let Some(value) = arg(matches, "value") {
        let theme = Theme::parse(value).ok_or_else(|| AppError::Usage(format!("unknown theme {value}")))?;
        app.preferences.set_theme(theme)?;
    }
    println!("{}", app.preferences.theme());
    Ok(())
}
