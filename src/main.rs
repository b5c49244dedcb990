use clap::{arg, command, value_parser, ArgAction, ArgGroup};
use log::{error, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use topicassign::{
    io, matrix, score, verify, AssignmentError, EngineKind, RankWeights, Solution, SolverOptions, Student, Topic,
};

fn main() {
    let args = command!()
        .about("Assign topics to students, such that the summed utility of their ranked choices is maximized.")
        .arg(arg!([TOPICS] "File in which each line contains the name of a topic. Repeat a line to offer a topic to multiple students.")
            .value_parser(value_parser!(PathBuf)))
        .arg(arg!([PREFERENCES] "File in which each line contains a student's name (without spaces) followed by the topic numbers (starting at 1) ordered by preference, e.g. 'Benjamin 3 2 4'")
            .value_parser(value_parser!(PathBuf)))
        .arg(arg!([WEIGHTS] "File with one number per line: line n specifies the utility of getting one's n-th choice")
            .value_parser(value_parser!(PathBuf)))
        .arg(arg!(-j --json <FILE> "Read all data from a single JSON file in the simple format instead")
            .value_parser(value_parser!(PathBuf)))
        .group(ArgGroup::new("input").args(["TOPICS", "json"]).required(true))
        .arg(arg!(-e --engine <ENGINE> "Solving engine to use")
            .value_parser(["hungarian", "bab"])
            .default_value("hungarian"))
        .arg(arg!(-t --timeout <SECONDS> "Give up, if the solving engine takes longer than this")
            .value_parser(value_parser!(u64)))
        .arg(arg!(--threads <NUM> "Number of worker threads for the branch and bound engine (default: number of CPUs)")
            .value_parser(value_parser!(u32)))
        .arg(arg!(-o --output <FILE> "Write the assignment to this file in the simple JSON format")
            .value_parser(value_parser!(PathBuf)))
        .arg(arg!(--"write-json" <FILE> "Only convert the input data to a JSON file in the simple format, without solving")
            .value_parser(value_parser!(PathBuf)))
        .arg(arg!(--verify <FILE> "Do not solve, but verify the assignment (or 0/1 selection matrix) from this JSON file")
            .value_parser(value_parser!(PathBuf))
            .conflicts_with("write-json"))
        .arg(arg!(-v --verbose "Print debug output").action(ArgAction::SetTrue))
        .get_matches();

    let default_filter = if args.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    // Read input data
    let data = if let Some(json_file) = args.get_one::<PathBuf>("json") {
        read_json_input(json_file)
    } else {
        read_line_input(
            args.get_one::<PathBuf>("TOPICS"),
            args.get_one::<PathBuf>("PREFERENCES"),
            args.get_one::<PathBuf>("WEIGHTS"),
        )
    };
    let (topics, students, weights) = match data {
        Ok(x) => x,
        Err((e, code)) => {
            error!("{}", e);
            std::process::exit(code);
        }
    };
    info!(
        "Read {} topics ({} places) and {} students",
        topics.len(),
        topics.iter().map(|t| t.capacity).sum::<usize>(),
        students.len()
    );

    if let Some(json_file) = args.get_one::<PathBuf>("write-json") {
        let result = File::create(json_file)
            .map_err(|e| e.to_string())
            .and_then(|file| io::simple::write_input_data(file, &topics, &students, &weights));
        if let Err(e) = result {
            error!("Could not write data file: {}", e);
            std::process::exit(exitcode::IOERR);
        }
        info!("Wrote input data to {}", json_file.display());
        return;
    }

    let solution = if let Some(result_file) = args.get_one::<PathBuf>("verify") {
        verify_result_file(result_file, &topics, &students, &weights)
    } else {
        let engine: EngineKind = args
            .get_one::<String>("engine")
            .and_then(|e| e.parse().ok())
            .unwrap_or(EngineKind::Hungarian);
        let options = SolverOptions {
            engine,
            timeout: args.get_one::<u64>("timeout").map(|s| Duration::from_secs(*s)),
            num_threads: args
                .get_one::<u32>("threads")
                .copied()
                .unwrap_or(num_cpus::get() as u32),
        };
        topicassign::solve(&topics, &students, &weights, &options)
            .map_err(|e| (e.to_string(), exit_code(&e)))
    };
    let solution = match solution {
        Ok(solution) => solution,
        Err((e, code)) => {
            error!("{}", e);
            std::process::exit(code);
        }
    };

    // Report result
    let max_score = matrix::build_utility_matrix(&topics, &students, &weights)
        .map(|utilities| score::theoretical_max_score(&utilities))
        .unwrap_or(solution.score);
    print!("{}", io::format_assignment(&solution.assignment, &topics, &students));
    print!(
        "\n{}",
        io::format_summary(&solution.assignment, &students, solution.score, max_score)
    );

    if let Some(output_file) = args.get_one::<PathBuf>("output") {
        let result = File::create(output_file)
            .map_err(|e| e.to_string())
            .and_then(|file| io::simple::write(file, &solution));
        if let Err(e) = result {
            error!("Could not write result file: {}", e);
            std::process::exit(exitcode::IOERR);
        }
        info!("Wrote result to {}", output_file.display());
    }
}

type InputData = (Vec<Topic>, Vec<Student>, RankWeights);

/// Exit code for each kind of failed assignment. Fatal errors and engine results, which contradict the balanced input,
/// indicate a defect of the program.
fn exit_code(e: &AssignmentError) -> exitcode::ExitCode {
    match e {
        AssignmentError::MalformedPreference { .. } | AssignmentError::InfeasibleByConstruction { .. } => {
            exitcode::DATAERR
        }
        AssignmentError::SolverUnavailable(_) => exitcode::UNAVAILABLE,
        AssignmentError::Infeasible | AssignmentError::Unbounded => exitcode::SOFTWARE,
        AssignmentError::AssignmentIncomplete { .. } => {
            warn!("The assignment is incomplete.");
            exitcode::DATAERR
        }
        _ if e.is_fatal() => exitcode::SOFTWARE,
        _ => exitcode::DATAERR,
    }
}

/// Verify a given assignment instead of calculating one. Returns it as a solution, if it passes the verification.
fn verify_result_file(
    file: &PathBuf,
    topics: &[Topic],
    students: &[Student],
    weights: &RankWeights,
) -> Result<Solution, (String, exitcode::ExitCode)> {
    let file = File::open(file).map_err(|e| (format!("Could not open result file: {}", e), exitcode::NOINPUT))?;
    let candidate = io::simple::read_result(BufReader::new(file))
        .map_err(|e| (format!("Could not read result file: {}", e), exitcode::DATAERR))?;
    let utilities =
        matrix::build_utility_matrix(topics, students, weights).map_err(|e| (e.to_string(), exit_code(&e)))?;

    let (verification, assignment) = verify::verify_candidate(topics, students.len(), &candidate);
    verification.into_result().map_err(|e| (e.to_string(), exit_code(&e)))?;
    let assignment = assignment.ok_or_else(|| ("Assignment is incomplete".to_owned(), exitcode::DATAERR))?;
    info!("The given assignment passed the verification");

    let score = score::assignment_score(&utilities, &assignment);
    Ok(Solution { assignment, score })
}

fn read_json_input(file: &PathBuf) -> Result<InputData, (String, exitcode::ExitCode)> {
    let file = File::open(file).map_err(|e| (format!("Could not open input file: {}", e), exitcode::NOINPUT))?;
    io::simple::read(BufReader::new(file))
        .map_err(|e| (format!("Could not read input file: {}", e), exitcode::DATAERR))
}

fn read_line_input(
    topics_file: Option<&PathBuf>,
    students_file: Option<&PathBuf>,
    weights_file: Option<&PathBuf>,
) -> Result<InputData, (String, exitcode::ExitCode)> {
    let (topics_file, students_file, weights_file) = match (topics_file, students_file, weights_file) {
        (Some(t), Some(s), Some(w)) => (t, s, w),
        _ => {
            return Err((
                "Please provide all needed files (topics, student preferences, weights).".to_owned(),
                exitcode::USAGE,
            ))
        }
    };
    let open = |path: &PathBuf| {
        File::open(path)
            .map(BufReader::new)
            .map_err(|e| (format!("Could not open {}: {}", path.display(), e), exitcode::NOINPUT))
    };
    let data_error = |e: String| (e, exitcode::DATAERR);

    let topics = io::lines::read_topics(open(topics_file)?).map_err(data_error)?;
    let students = io::lines::read_students(open(students_file)?).map_err(data_error)?;
    let weights = io::lines::read_weights(open(weights_file)?).map_err(data_error)?;
    Ok((topics, students, weights))
}
