use crate::cli::CheckArgs;
use crate::pipeline::DependencyReport;
use crate::utils::Result;

pub fn check(args: CheckArgs) -> Result<()> {
    let report = DependencyReport::check(&args.tools.settings());
    print!("{}", report);
    report.ensure_complete()
}
