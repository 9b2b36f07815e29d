//! Bot module wiring Matrix, the command layer and the reminder engine.
//!
//! # Architecture
//!
//! The bot runs the Matrix sync loop plus four cadences on a
//! [`TokioScheduler`]:
//!
//! 1. **fine** - "time has begun" reminders
//! 2. **coarse** - "did you pray?" reminders and their escalation
//! 3. **day boundary** - finished days are swept into the qazo ledger
//! 4. **inactivity** - silent users are paused
//!
//! # Command Processing Flow
//!
//! ```text
//! Matrix Message → Parse Command → Refresh Activity → Day View → Execute → Apply Effect → Reply
//! ```

use std::{future::Future, sync::Arc, time::Duration};

use futures::FutureExt;
use log::{error, info};

use crate::{
    Args,
    clock::SystemClock,
    commands::{
        Command, CommandContext, CommandEffect, CommandParseError, CommandResult, Commander,
        format_action_outcome, format_internal_error, format_ledger, format_location_set,
        format_welcome_back,
    },
    config::Config,
    matrix::{MatrixClient, UserCredentials},
    messaging::Messenger,
    prayers::{SalahTimeService, TimeService},
    reminders::{ReminderEngine, ReminderError},
    scheduler::{Scheduler, Task, TokioScheduler},
    store::{Location, Store, User},
    utils::get_path,
};

type Engine = ReminderEngine<MatrixClient, SalahTimeService>;

struct MessageContext {
    body: String,
    room_id: String,
    sender_id: String,
    event_id: String,
    matrix_client: Arc<MatrixClient>,
    engine: Arc<Engine>,
    commander: Arc<Commander>,
    default_location: Arc<Location>,
}

struct Cadences {
    fine: Duration,
    coarse: Duration,
    day_boundary: Duration,
    inactivity: Duration,
}

pub struct Bot {
    matrix_client: Arc<MatrixClient>,

    engine: Arc<Engine>,

    commander: Arc<Commander>,

    /// Location of new users until they set their own
    default_location: Arc<Location>,

    cadences: Cadences,
}

impl Bot {
    pub async fn new(config: Config, args: Args) -> Result<Self, anyhow::Error> {
        let settings = config.reminder_settings()?;
        let time_service =
            SalahTimeService::new(&config.prayer_times.method, &config.prayer_times.madhab)?;

        let commander = Arc::new(Commander::new(config.prayer_times.radius_km));
        let default_location = commander
            .find_city(&config.prayer_times.default_city)
            .ok_or_else(|| {
                anyhow::anyhow!("unknown default city '{}'", config.prayer_times.default_city)
            })?;

        // Open the store first, a corrupted store must stop the bot before login
        let store = Arc::new(Store::open(get_path(&args.data, "store.json")?).await?);

        // Create matrix client
        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id,
                    password: config.matrix.password,
                    passphrase: config.matrix.passphrase,
                },
                &get_path(&args.data, "session")?,
            )
            .await?,
        );

        let engine = Arc::new(ReminderEngine::new(
            Arc::clone(&matrix_client),
            store,
            time_service,
            Arc::new(SystemClock),
            settings,
        ));

        Ok(Bot {
            matrix_client,
            engine,
            commander,
            default_location: Arc::new(default_location),
            cadences: Cadences {
                fine: config.reminders.fine_interval(),
                coarse: config.reminders.coarse_interval(),
                day_boundary: config.reminders.day_boundary_interval(),
                inactivity: config.inactivity.sweep_interval(),
            },
        })
    }

    pub async fn start(self) {
        // Dropping the scheduler stops the cadences, it lives as long as the sync
        let mut scheduler = TokioScheduler::new();
        self.schedule_cadences(&mut scheduler);

        // Clone references for the message handler
        let matrix_client = Arc::clone(&self.matrix_client);
        let engine = Arc::clone(&self.engine);
        let commander = Arc::clone(&self.commander);
        let default_location = Arc::clone(&self.default_location);

        // Create message handler closure
        let on_message =
            move |body: String, room_id: String, sender_id: String, event_id: String| {
                let ctx = MessageContext {
                    body,
                    room_id,
                    sender_id,
                    event_id,
                    matrix_client: Arc::clone(&matrix_client),
                    engine: Arc::clone(&engine),
                    commander: Arc::clone(&commander),
                    default_location: Arc::clone(&default_location),
                };
                Self::handle_matrix_message(ctx)
            };

        // Start matrix sync
        if let Err(e) = self.matrix_client.sync(on_message).await {
            error!("matrix sync failed: {:?}", e);
        }
        scheduler.shutdown();
    }

    fn schedule_cadences(&self, scheduler: &mut impl Scheduler) {
        scheduler.every(
            "fine tick",
            self.cadences.fine,
            engine_task(&self.engine, |e| async move { e.fine_tick().await }),
        );
        scheduler.every(
            "coarse tick",
            self.cadences.coarse,
            engine_task(&self.engine, |e| async move { e.coarse_tick().await }),
        );
        scheduler.every(
            "day boundary sweep",
            self.cadences.day_boundary,
            engine_task(&self.engine, |e| async move { e.day_boundary_tick().await }),
        );
        scheduler.every(
            "inactivity sweep",
            self.cadences.inactivity,
            engine_task(&self.engine, |e| async move { e.inactivity_sweep().await }),
        );
    }

    fn handle_matrix_message(ctx: MessageContext) {
        tokio::spawn(async move {
            let reply = handle_command(
                &ctx.engine,
                &ctx.commander,
                &ctx.default_location,
                &ctx.body,
                &ctx.room_id,
                &ctx.sender_id,
            )
            .await;

            // Send response back to matrix room
            if let Some(reply) = reply {
                ctx.matrix_client
                    .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, &reply)
                    .await;
            }
        });
    }
}

/// Wraps an engine method into a scheduler task.
fn engine_task<F, Fut>(engine: &Arc<Engine>, run: F) -> Task
where
    F: Fn(Arc<Engine>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let engine = Arc::clone(engine);
    Arc::new(move || run(Arc::clone(&engine)).boxed())
}

/// Runs a message through the command pipeline and returns the reply, or
/// `None` when the message is not for the bot.
async fn handle_command<M: Messenger, T: TimeService>(
    engine: &ReminderEngine<M, T>,
    commander: &Commander,
    default_location: &Location,
    body: &str,
    room_id: &str,
    sender_id: &str,
) -> Option<String> {
    // Parse body to extract command
    let parsed = match commander.parse(body) {
        Ok(command) => Ok(command),
        // Return silently if the command is not for the bot
        Err(CommandParseError::NotForBot) => return None,
        Err(CommandParseError::InvalidCommand(message)) => Err(message),
    };

    // Any command, even an invalid one, counts as activity
    let (user, was_blocked) = match engine
        .register_activity(sender_id, room_id, default_location)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!("failed to register activity of {}: {}", sender_id, e);
            return Some(format_internal_error());
        }
    };

    let reply = match parsed {
        Ok(command) => match run_command(engine, commander, &command, user).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("failed to run command {:?} for {}: {}", command, sender_id, e);
                format_internal_error()
            }
        },
        Err(message) => message,
    };

    if was_blocked {
        return Some(format!("{}\n\n{}", format_welcome_back(), reply));
    }
    Some(reply)
}

async fn run_command<M: Messenger, T: TimeService>(
    engine: &ReminderEngine<M, T>,
    commander: &Commander,
    command: &Command,
    user: User,
) -> Result<String, ReminderError> {
    let day = engine.day_view(&user).await?;
    let context = CommandContext { user, day };

    let result = commander.execute(command, &context);
    apply_effect(engine, &context.user, result).await
}

/// Applies the state change requested by a command and completes its reply.
async fn apply_effect<M: Messenger, T: TimeService>(
    engine: &ReminderEngine<M, T>,
    user: &User,
    result: CommandResult,
) -> Result<String, ReminderError> {
    let CommandResult { response, effect } = result;

    let Some(effect) = effect else {
        return Ok(response);
    };

    match effect {
        CommandEffect::Prayer(action) => {
            let outcome = engine.on_action(user, action.prayer, action.kind).await?;
            Ok(format_action_outcome(&outcome))
        }
        CommandEffect::Adjust(direction, delta) => {
            let ledger = engine.adjust_ledger(user, &delta).await?;
            info!("user {} adjusted qazo ({:?}): {}", user.id, direction, delta);
            Ok(format!("{}\n\n{}", response, format_ledger(&ledger)))
        }
        CommandEffect::ResetLedger => {
            let ledger = engine.reset_ledger(user).await?;
            info!("user {} reset qazo", user.id);
            Ok(format!("{}\n\n{}", response, format_ledger(&ledger)))
        }
        CommandEffect::Relocate(location) => {
            let updated = engine.relocate(user, &location).await?;
            Ok(format_location_set(&updated.location))
        }
    }
}
