use crate::{format::Formatter, INVALID_BACKEND_REF};
use ngx_gateway_controller_core::{Backend, BackendGroup};

/// Writes a `split_clients` block for every group with more than one backend.
pub(crate) fn write(fmt: &mut Formatter<'_>, groups: &[BackendGroup]) {
    for group in groups.iter().filter(|g| g.needs_split()) {
        let header = format!(
            "split_clients $request_id ${}",
            variable_name(&group.name())
        );
        fmt.block(&header, |fmt| {
            for (percent, value) in distributions(&group.backends) {
                fmt.line(&format!("{percent}% {value};"));
            }
        });
        fmt.blank();
    }
}

/// The upstream a group's requests are proxied to: the single backend's
/// upstream, or the split variable when traffic is split.
pub(crate) fn proxy_target(group: &BackendGroup) -> String {
    if group.needs_split() {
        return format!("${}", variable_name(&group.name()));
    }
    match group.backends.as_slice() {
        [backend] if backend.valid && backend.weight > 0 => backend.upstream_name.clone(),
        _ => INVALID_BACKEND_REF.to_string(),
    }
}

/// nginx variable names may not contain hyphens.
fn variable_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Splits traffic by weight. Percentages are floored to two decimals and the
/// last backend receives the remainder, so that they always sum to 100.
fn distributions(backends: &[Backend]) -> Vec<(String, &str)> {
    let total = backends.iter().map(|b| u64::from(b.weight)).sum::<u64>();
    if total == 0 {
        return vec![("100".to_string(), INVALID_BACKEND_REF)];
    }

    let Some((last, rest)) = backends.split_last() else {
        return vec![];
    };

    let mut available = 100.0_f64;
    let mut distributions = Vec::with_capacity(backends.len());
    for backend in rest {
        let percent = percent_of(backend.weight, total);
        available -= percent;
        distributions.push((format!("{percent:.2}"), value(backend)));
    }
    distributions.push((format!("{available:.2}"), value(last)));
    distributions
}

fn percent_of(weight: u32, total: u64) -> f64 {
    let percent = (f64::from(weight) * 100.0) / total as f64;
    (percent * 100.0).floor() / 100.0
}

fn value(backend: &Backend) -> &str {
    if backend.valid {
        &backend.upstream_name
    } else {
        INVALID_BACKEND_REF
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngx_gateway_controller_core::ResourceId;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn backend(name: &str, weight: u32, valid: bool) -> Backend {
        Backend {
            upstream_name: name.to_string(),
            weight,
            valid,
        }
    }

    fn group(backends: Vec<Backend>) -> BackendGroup {
        BackendGroup {
            source: ResourceId::new("test-ns", "cafe"),
            rule_idx: 0,
            backends,
        }
    }

    #[rstest]
    #[case(vec![1, 1], vec!["50.00", "50.00"])]
    #[case(vec![2, 1], vec!["66.66", "33.34"])]
    #[case(vec![1, 1, 1], vec!["33.33", "33.33", "33.34"])]
    #[case(vec![20, 30, 50], vec!["20.00", "30.00", "50.00"])]
    #[case(vec![800, 1200], vec!["40.00", "60.00"])]
    #[case(vec![0, 1], vec!["0.00", "100.00"])]
    fn splits_by_weight(#[case] weights: Vec<u32>, #[case] expected: Vec<&str>) {
        let backends = weights
            .iter()
            .enumerate()
            .map(|(i, w)| backend(&format!("up{i}"), *w, true))
            .collect::<Vec<_>>();
        let percents = distributions(&backends)
            .into_iter()
            .map(|(percent, _)| percent)
            .collect::<Vec<_>>();
        assert_eq!(percents, expected);
    }

    #[test]
    fn zero_total_weight_goes_to_invalid_backend() {
        let backends = vec![backend("a", 0, true), backend("b", 0, true)];
        assert_eq!(
            distributions(&backends),
            vec![("100".to_string(), INVALID_BACKEND_REF)]
        );
    }

    #[test]
    fn invalid_backends_keep_their_share() {
        let backends = vec![backend("a", 1, true), backend("", 1, false)];
        assert_eq!(
            distributions(&backends),
            vec![
                ("50.00".to_string(), "a"),
                ("50.00".to_string(), INVALID_BACKEND_REF),
            ]
        );
    }

    #[rstest]
    #[case(vec![], "invalid-backend-ref")]
    #[case(vec![backend("test_coffee_80", 1, true)], "test_coffee_80")]
    #[case(vec![backend("test_coffee_80", 0, true)], "invalid-backend-ref")]
    #[case(vec![backend("", 1, false)], "invalid-backend-ref")]
    #[case(
        vec![backend("a", 1, true), backend("b", 1, true)],
        "$test_ns__cafe_rule0"
    )]
    fn proxies_to_group(#[case] backends: Vec<Backend>, #[case] expected: &str) {
        assert_eq!(proxy_target(&group(backends)), expected);
    }

    #[test]
    fn writes_split_clients() {
        let groups = vec![
            group(vec![backend("a", 1, true)]),
            group(vec![backend("a", 3, true), backend("b", 1, true)]),
        ];
        let mut out = String::new();
        write(&mut Formatter::new(&mut out), &groups);
        assert_eq!(
            out,
            "\
split_clients $request_id $test_ns__cafe_rule0 {
    75.00% a;
    25.00% b;
}

"
        );
    }
}
