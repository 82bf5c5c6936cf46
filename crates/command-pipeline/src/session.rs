//! Session: chains tokens, renders them in context and runs the result

use std::fmt;
use std::io::{BufRead, Write};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use tracing::{error, info};

use crate::context::{invoking_user, Context, ContextStack};
use crate::error::{Error, Result};
use crate::output::CommandOutput;
use crate::shell::{LocalShell, Shell};
use crate::token::{PlainCommand, Redirect, Token};

/// How [`Session::run`] reacts to and reports on a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Return `Err` when the shell cannot be invoked; otherwise the
    /// diagnostic comes back inside the [`CommandOutput`]
    pub halt_on_nonzero: bool,
    /// Do not log the command line before running it
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            halt_on_nonzero: true,
            quiet: false,
        }
    }
}

impl RunOptions {
    /// Keep going after an invocation failure
    pub fn no_halt(mut self) -> Self {
        self.halt_on_nonzero = false;
        self
    }

    /// Skip logging the command line
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// Builds one command line at a time and runs it through a [`Shell`]
///
/// ```no_run
/// use command_pipeline::{Context, Session};
///
/// # fn example() -> command_pipeline::Result<()> {
/// let mut s = Session::load(Context::new().with_cwd("/var/log"))?;
/// let output = s
///     .command("cat", ["syslog"])
///     .pipe()
///     .command("grep", ["sshd"])
///     .execute()?;
/// for line in output.stdout_lines() {
///     println!("{line}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    commands: Vec<Token>,
    contexts: ContextStack,
    invoking_user: String,
    shell: Box<dyn Shell>,
}

impl Session {
    /// A local session for the current OS user, with no context
    pub fn new() -> Result<Self> {
        Ok(Self::with_shell(invoking_user()?, LocalShell::new()))
    }

    /// A local session for the current OS user, starting in `context`
    pub fn load(context: Context) -> Result<Self> {
        let mut session = Self::new()?;
        session.push_context(context)?;
        Ok(session)
    }

    /// A session with an explicit invoking user and shell
    pub fn with_shell(invoking_user: impl Into<String>, shell: impl Shell + 'static) -> Self {
        Self {
            commands: Vec::new(),
            contexts: ContextStack::new(),
            invoking_user: invoking_user.into(),
            shell: Box::new(shell),
        }
    }

    /// The user this session considers itself to be running as
    pub fn invoking_user(&self) -> &str {
        &self.invoking_user
    }

    /// The active context
    pub fn current_context(&self) -> &Context {
        self.contexts.current()
    }

    /// Number of contexts on the stack
    pub fn context_depth(&self) -> usize {
        self.contexts.depth()
    }

    /// Validate `context` and make it active
    pub fn push_context(&mut self, context: Context) -> Result<&mut Self> {
        context.validate()?;
        self.contexts.push(context);
        Ok(self)
    }

    /// Drop the active context, restoring the previous one
    pub fn pop_context(&mut self) -> Option<Context> {
        self.contexts.pop()
    }

    /// Enter a scope on the active context; it is popped when the guard drops
    ///
    /// Fails with [`Error::InvalidContext`] if no context was pushed.
    pub fn enter(&mut self) -> Result<ScopedSession<'_>> {
        if self.contexts.is_empty() {
            return Err(Error::InvalidContext);
        }
        Ok(ScopedSession { session: self })
    }

    /// Run `f` with `context` active, popping it again on every exit path
    pub fn with_context<T>(
        &mut self,
        context: Context,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        self.push_context(context)?;
        let mut scope = self.enter()?;
        f(&mut *scope)
    }

    /// Append a plain command
    pub fn command<I, S>(&mut self, name: impl AsRef<str>, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.push_command(PlainCommand::new(name).args(args))
    }

    /// Append a command that takes no arguments
    pub fn call(&mut self, name: impl AsRef<str>) -> &mut Self {
        self.push_command(PlainCommand::new(name))
    }

    /// Append a prepared command, e.g. one with options
    pub fn push_command(&mut self, command: PlainCommand) -> &mut Self {
        self.commands.push(Token::Command(command));
        self
    }

    /// Append `|`
    pub fn pipe(&mut self) -> &mut Self {
        self.commands.push(Token::Pipe);
        self
    }

    /// Append `&&`
    pub fn and(&mut self) -> &mut Self {
        self.commands.push(Token::And);
        self
    }

    /// Append `||`
    pub fn or(&mut self) -> &mut Self {
        self.commands.push(Token::Or);
        self
    }

    /// Append a redirect of stdout, stderr or both into `to_file`
    pub fn redirect(
        &mut self,
        to_file: impl Into<PathBuf>,
        append: bool,
        stdout: bool,
        stderr: bool,
    ) -> Result<&mut Self> {
        let redirect = Redirect::from_flags(to_file, append, stdout, stderr)?;
        self.commands.push(Token::Redirect(redirect));
        Ok(self)
    }

    /// Empty the command buffer
    pub fn clear(&mut self) -> &mut Self {
        self.commands.clear();
        self
    }

    /// The buffered tokens
    pub fn tokens(&self) -> &[Token] {
        &self.commands
    }

    /// Render the buffer into one command line, wrapped by the active context
    pub fn render(&self) -> String {
        wrap_line(
            render_tokens(&self.commands),
            self.contexts.current(),
            &self.invoking_user,
        )
    }

    /// Log the rendered command line without running it
    pub fn spit(&self) {
        info!("{}", self.render());
    }

    /// Prompt on stdout and read one line from stdin
    pub fn stdin(&self, message: &str) -> Result<String> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        prompt(message, &mut stdin.lock(), &mut stdout.lock())
    }

    /// Run with [`RunOptions::default`]
    pub fn execute(&mut self) -> Result<CommandOutput> {
        self.run(RunOptions::default())
    }

    /// Render, run and clear the buffer, blocking until the shell exits
    pub fn run(&mut self, options: RunOptions) -> Result<CommandOutput> {
        futures_lite::future::block_on(self.run_async(options))
    }

    /// Async form of [`Session::run`]
    ///
    /// The buffer is cleared before the shell is invoked, so it is empty
    /// afterwards whatever the outcome.
    pub async fn run_async(&mut self, options: RunOptions) -> Result<CommandOutput> {
        let line = self.render();
        self.clear();

        let context = self.contexts.current();
        if !options.quiet && context.logging {
            info!("{}", line);
        }

        match self.shell.invoke(&line, context.env.as_ref()).await {
            Ok(output) => {
                let result = CommandOutput::from(output);
                if result.stdout.is_some() {
                    return Ok(result);
                }
                if result.stderr.is_some() {
                    result.print_stderr();
                }
                Ok(result)
            }
            Err(err) => {
                error!("Unable to run '{}'", line);
                let result = CommandOutput::default().with_traceback(traceback(&err));
                result.print_traceback();

                if options.halt_on_nonzero {
                    return Err(err);
                }
                Ok(result)
            }
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("commands", &self.commands)
            .field("contexts", &self.contexts)
            .field("invoking_user", &self.invoking_user)
            .finish_non_exhaustive()
    }
}

/// A session borrowed for the lifetime of one context
///
/// Dropping the guard pops exactly one context, including on early return
/// and unwinding.
pub struct ScopedSession<'a> {
    session: &'a mut Session,
}

impl Deref for ScopedSession<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for ScopedSession<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for ScopedSession<'_> {
    fn drop(&mut self) {
        self.session.contexts.pop();
    }
}

/// Join tokens into a command body ending in `;`
///
/// Operators get a single leading space, as does a command that follows an
/// operator. Two commands in a row are separated by `; `.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut output = String::new();
    let mut previous: Option<&Token> = None;

    for token in tokens {
        let separator = match previous {
            None => "",
            Some(_) if token.is_operator() => " ",
            Some(prev) if prev.is_operator() => " ",
            Some(_) => "; ",
        };
        output.push_str(separator);
        output.push_str(&token.to_string());
        previous = Some(token);
    }

    format!("{};", output.trim())
}

/// Wrap a rendered body in the context's cd, source, sudo and ssh layers
///
/// From the outside in: `ssh`, then privilege elevation, then `source`, then
/// `cd`, then the body. The file is sourced in the starting directory, before
/// the `cd`.
pub fn wrap_line(body: String, context: &Context, invoking_user: &str) -> String {
    let mut output = body;

    if let Some(cwd) = &context.cwd {
        output = format!("cd {} && {}", cwd.display(), output);
    }

    if let Some(src) = &context.src {
        output = format!("source {} && {}", src.display(), output);
    }

    let user = context.effective_user(invoking_user);
    if context.sudo {
        output = if user != invoking_user {
            format!("sudo su - {} -c '{}'", user, output)
        } else if invoking_user == "root" {
            format!("su - {} -c '{}'", user, output)
        } else {
            format!("sudo {}", output)
        };
    }

    if let Some(hostname) = &context.hostname {
        let ssh_options = match &context.ssh_config {
            Some(config) if !config.is_empty() => format!(" {} ", config),
            _ => " ".to_string(),
        };
        output = format!("ssh{}{}@{} '{}'", ssh_options, user, hostname, output);
    }

    output
}

/// Write `message`, then read one line without its line ending
pub fn prompt<R: BufRead, W: Write>(message: &str, input: &mut R, output: &mut W) -> Result<String> {
    output.write_all(message.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn traceback(err: &Error) -> Vec<String> {
    let mut lines = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines
}
