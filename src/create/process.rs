use crate::{
    allocate::ShareAssignment,
    common::*,
    create::errors::CreateError,
    distribute::{DistributionReport, Orchestrator},
};

/// Everything needed to create a pooled wallet and register its membership.
#[derive(Clone, Debug)]
pub struct CreateWalletArgs {
    pub wallet: Address,
    pub name: String,
    pub total_shares: u64,
    /// Computed share assignments, usually the output of
    /// [`allocate_shares`](crate::allocate::allocate_shares). Zero-share
    /// members are accepted and skipped at registration time.
    pub members: Vec<ShareAssignment>,
}

fn check_name(name: &str) -> Result<(), CreateError> {
    if name.is_empty() {
        return Err(CreateError::NameRequired);
    }
    if name.contains(' ') {
        return Err(CreateError::NameContainsSpaces);
    }
    Ok(())
}

fn check_total_shares(total_shares: u64) -> Result<(), CreateError> {
    if total_shares == 0 {
        return Err(CreateError::ZeroTotalShares);
    }
    Ok(())
}

fn check_members(members: &[ShareAssignment], total_shares: u64) -> Result<(), CreateError> {
    let mut seen: IndexSet<Address> = IndexSet::with_capacity(members.len());
    let mut sum = Decimal::ZERO;
    let mut registrable = 0;

    for member in members {
        if member.share_units < Decimal::ZERO {
            return Err(CreateError::NegativeShare(member.address.to_string()));
        }
        if !seen.insert(member.address) {
            return Err(CreateError::DuplicateMember(member.address.to_string()));
        }
        if member.share_units > Decimal::ZERO {
            registrable += 1;
        }
        sum += member.share_units;
    }

    if registrable == 0 {
        return Err(CreateError::NoMembers);
    }

    // tolerate one unit in the last fractional place of rounding drift
    let expected = Decimal::from(total_shares);
    let epsilon = Decimal::new(1, SHARE_FRACTIONAL_DIGITS);
    if (sum - expected).abs() > epsilon {
        return Err(CreateError::SharesMustSumToTotal {
            expected: expected.to_string(),
            actual: sum.to_string(),
        });
    }

    Ok(())
}

/// Validate `args` without touching the network.
pub fn validate_create_args(args: &CreateWalletArgs) -> Result<(), CreateError> {
    check_name(&args.name)?;
    check_total_shares(args.total_shares)?;
    check_members(&args.members, args.total_shares)?;
    Ok(())
}

/// Create the pooled wallet and register every member with a positive share.
///
/// The initialization operation leads the plan in its own batch;
/// registrations follow in input order and are batched like any other member
/// operation. Fails up front if the wallet already exists on the ledger.
pub async fn process_create<P: FanoutProgram, N: Network>(
    orchestrator: &Orchestrator<P, N>,
    args: &CreateWalletArgs,
) -> Result<DistributionReport> {
    validate_create_args(args)?;

    let program = orchestrator.program();
    if program.fetch_wallet_state(&args.wallet).await?.is_some() {
        return Err(CreateError::WalletAlreadyExists(args.wallet.to_string()).into());
    }

    let mut operations: Vec<AtomicOperation> = Vec::with_capacity(args.members.len() + 1);
    operations.push(program.build_initialize_operation(
        &args.wallet,
        &args.name,
        args.total_shares,
    ));

    let mut skipped = 0;
    for member in &args.members {
        if member.share_units.is_zero() {
            skipped += 1;
            continue;
        }
        operations.push(program.build_registration_operation(
            &args.wallet,
            &member.address,
            member.share_units,
        ));
    }

    info!(
        wallet = %args.wallet,
        name = args.name,
        registrations = operations.len() - 1,
        skipped,
        "creating fanout wallet"
    );

    // registrations carry no payouts, so there is nothing to record
    let stakes = IndexMap::new();
    orchestrator.plan_and_submit(operations, &stakes).await
}
