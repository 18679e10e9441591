pub mod fasta;
pub mod inputs;
pub mod tools;

pub use fasta::{read_fasta, SequenceRecord};
pub use inputs::collect_inputs;
pub use tools::find_executable;

pub type Result<T> = std::result::Result<T, String>;

pub fn handle_error_and_exit(err: String) -> ! {
    log::error!("{}", err);
    std::process::exit(1);
}

pub fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    log::debug!("Initializing scan thread pool with {} threads...", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("prionscan-{}", i))
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))
}
