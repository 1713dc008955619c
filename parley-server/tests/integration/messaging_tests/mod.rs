mod test_offer_fans_out;
mod test_targeted_ice_candidate;
