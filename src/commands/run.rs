use crate::cli::RunArgs;
use crate::pipeline::{
    BatchDriver, PdftoppmRasterizer, PipelineLayout, PlaacScorer, RscriptPlotter,
};
use crate::utils::{collect_inputs, initialize_thread_pool, Result};

pub fn run(args: RunArgs) -> Result<()> {
    let filter = args.filter.build_filter()?;
    let settings = args.tools.settings();
    let layout = PipelineLayout {
        tools_dir: settings.tools_dir.clone(),
        output_dir: args.output_dir.clone(),
        filtered_dir: args.filtered_dir.clone(),
        temp_dir: args.temp_dir.clone(),
    }
    .prepare()?;

    let inputs = collect_inputs(&args.input, &args.extension)?;
    log::info!("Found {} FASTA files in {}", inputs.len(), args.input.display());

    let scorer = PlaacScorer::new(settings.clone());
    let plotter = RscriptPlotter::new(settings.clone());
    let rasterizer = PdftoppmRasterizer::new(settings);
    let driver = BatchDriver::new(&layout, &scorer, &plotter, &rasterizer, &filter)
        .keep_flagged_pages(args.keep_flagged_pages)
        .flagged_pages_only(args.flagged_pages_only);

    let pool = initialize_thread_pool(args.num_threads)?;
    let summary = pool.install(|| driver.run(&inputs));
    summary.log();

    if let Some(path) = &args.summary {
        summary.write_json(path)?;
        log::info!("Summary written to {}", path.display());
    }
    Ok(())
}
