//! Composite trapezoid rule.

use crate::registry::RegisteredFunction;
use crate::request::IntegrationRequest;

/// Integrate `f` over `[start, end]` using `steps` equal subintervals.
///
/// Subintervals are summed left to right. `steps` must be positive.
pub fn integrate<F>(f: F, start: f64, end: f64, steps: u64) -> f64
where
    F: Fn(f64) -> f64,
{
    let dx = (end - start) / steps as f64;

    let mut area = 0.0;
    for i in 0..steps {
        let small_x = start + i as f64 * dx;
        let big_x = start + (i + 1) as f64 * dx;
        area += dx * (f(small_x) + f(big_x)) / 2.0;
    }
    area
}

pub fn integrate_function(func: &RegisteredFunction, start: f64, end: f64, steps: u64) -> f64 {
    integrate(|x| func.eval(x), start, end, steps)
}

/// Area for a validated request.
pub fn integrate_request(request: &IntegrationRequest) -> f64 {
    let func = request.function_id.function();
    integrate_function(&func, request.range_start, request.range_end, request.num_steps)
}
